//! Wizard configuration
//!
//! Everything the engine needs beyond the page set is either a platform
//! setting or one of the few knobs below. Values come from (lowest to
//! highest precedence) defaults, an optional JSON file, and environment
//! variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::WizardError;
use crate::host::Platform;

/// Platform setting holding the probe host name.
pub const SETTING_CAPTIVE_PORTAL_SERVER: &str = "captive_portal_server";
/// Platform flag set to `1` once the device is provisioned.
pub const SETTING_DEVICE_PROVISIONED: &str = "device_provisioned";
/// Platform flag set to `1` once the user finished setup.
pub const SETTING_USER_SETUP_COMPLETE: &str = "user_setup_complete";
/// Comma-separated enabled location providers.
pub const SETTING_LOCATION_PROVIDERS: &str = "location_providers_allowed";
/// `1` when the backup service is enabled.
pub const SETTING_BACKUP_ENABLED: &str = "backup_enabled";
/// `1` when the clock is set from the network; hides the date/time page.
pub const SETTING_AUTO_TIME: &str = "auto_time";

/// Broadcast sent to the platform when setup completes.
pub const ACTION_SETUP_FINISHED: &str = "setupwizard.action.SETUP_FINISHED";

pub const DEFAULT_CAPTIVE_PORTAL_SERVER: &str = "download.mokeedev.com";
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;

pub const ENV_CAPTIVE_PORTAL_SERVER: &str = "SETUP_WIZARD_CAPTIVE_PORTAL_SERVER";
pub const ENV_PROBE_TIMEOUT_MS: &str = "SETUP_WIZARD_PROBE_TIMEOUT_MS";
pub const ENV_GUEST: &str = "SETUP_WIZARD_GUEST";

/// Top-level wizard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Overrides the platform's `captive_portal_server` setting
    pub captive_portal_server: Option<String>,
    /// Connect and read timeout of the captive-portal probe
    pub probe_timeout_ms: u64,
    /// Guest sessions finish immediately and never broadcast
    pub guest_user: bool,
    /// Where the saved state blob lives between process restarts
    pub state_file: Option<PathBuf>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            captive_portal_server: None,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            guest_user: false,
            state_file: None,
        }
    }
}

impl WizardConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply `SETUP_WIZARD_*` environment overrides.
    pub fn apply_env(mut self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(self)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(server) = lookup(ENV_CAPTIVE_PORTAL_SERVER) {
            if !server.trim().is_empty() {
                self.captive_portal_server = Some(server.trim().to_string());
            }
        }
        if let Some(timeout) = lookup(ENV_PROBE_TIMEOUT_MS) {
            self.probe_timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("{} must be an integer, got {:?}", ENV_PROBE_TIMEOUT_MS, timeout))?;
        }
        if let Some(guest) = lookup(ENV_GUEST) {
            self.guest_user = matches!(guest.trim(), "1" | "true" | "yes");
        }
        self.validate()?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.probe_timeout_ms == 0 {
            return Err(WizardError::config("probe_timeout_ms must be greater than zero"));
        }
        if let Some(server) = &self.captive_portal_server {
            if server.is_empty() || server.contains(char::is_whitespace) || server.contains('/') {
                return Err(WizardError::config(format!(
                    "captive_portal_server must be a bare host name, got {:?}",
                    server
                )));
            }
        }
        Ok(())
    }
}

/// Resolved captive-portal probe parameters.
///
/// Shared read-only with worker threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl ProbeConfig {
    /// Probe URL for a server: `http://<server>/generate_204`.
    pub fn for_server(server: &str, timeout: Duration) -> Self {
        Self {
            url: format!("http://{}/generate_204", server),
            connect_timeout: timeout,
            read_timeout: timeout,
        }
    }

    /// Server precedence: config/env override, platform setting, default.
    pub fn resolve(config: &WizardConfig, platform: &dyn Platform) -> Self {
        let server = config
            .captive_portal_server
            .clone()
            .or_else(|| platform.get_setting(SETTING_CAPTIVE_PORTAL_SERVER))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CAPTIVE_PORTAL_SERVER.to_string());

        tracing::debug!("Captive portal server resolved to {}", server);
        Self::for_server(server.trim(), Duration::from_millis(config.probe_timeout_ms))
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::for_server(
            DEFAULT_CAPTIVE_PORTAL_SERVER,
            Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
        )
    }
}
