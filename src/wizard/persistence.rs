//! Saved state blob
//!
//! The host stores an opaque key → value mapping across reconfiguration
//! and process death. The wizard owns the `"data"` entry:
//!
//! ```json
//! { "data": { "cursor": 2, "pages": { "account": { "completed": true, "extra": {...} } } } }
//! ```
//!
//! Unknown keys are ignored and missing fields take their defaults, so blobs
//! written by older or newer builds still load.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Key of the wizard's own entry in the blob.
pub const DATA_KEY: &str = "data";

/// Per-page state record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRecord {
    pub completed: bool,
    /// Page-owned opaque payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Cursor plus the per-page records, keyed by page key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardSnapshot {
    /// Registry position. Signed so out-of-range values from a foreign blob
    /// can be detected and clamped instead of failing to parse.
    pub cursor: i64,
    pub pages: BTreeMap<String, PageRecord>,
}

/// The whole host-side blob.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedState(BTreeMap<String, Value>);

impl SavedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &WizardSnapshot) -> Result<Self> {
        let mut state = Self::new();
        state
            .0
            .insert(DATA_KEY.to_string(), serde_json::to_value(snapshot)?);
        Ok(state)
    }

    /// The wizard entry. A blob without one yields an empty snapshot.
    pub fn snapshot(&self) -> Result<WizardSnapshot> {
        match self.0.get(DATA_KEY) {
            Some(data) => Ok(WizardSnapshot::deserialize(data)?),
            None => Ok(WizardSnapshot::default()),
        }
    }

    /// Host-owned entries live next to the wizard's.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = self
            .to_json_string()
            .context("Failed to serialize wizard state")?;

        // Write beside the target, then rename over it
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write wizard state to {:?}", tmp))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move wizard state into {:?}", path))?;

        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read wizard state from {:?}", path.as_ref()))?;

        Self::from_json_str(&content).context("Failed to parse wizard state JSON")
    }
}
