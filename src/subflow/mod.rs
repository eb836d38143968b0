//! Async sub-flow adapter
//!
//! Bridges externally-driven results (account creation, captive-portal
//! remediation, system settings screens, worker-thread probes) into the
//! wizard's turn-based navigation.
//!
//! # Per-page state machine
//!
//! ```text
//! Idle --LOAD--> Working | Dispatching(request)
//! Working --worker result--> Dispatching(request) | Advancing | Retreating
//! Dispatching(request) --OK / FIRST_USER--> Advancing
//! Dispatching(request) --CANCELED--------> Retreating
//! Dispatching(request) --OTHER-----------> Advancing
//! ```
//!
//! `Advancing` and `Retreating` are terminal until the page is mounted again.
//! A result that does not match the awaited request is dropped, which makes
//! duplicate deliveries harmless.

pub mod account;
pub mod probe;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::WizardError;
use account::AuthenticatorResponse;
use probe::ProbeVerdict;

/// Stable identifier of an external sub-flow request.
///
/// The numeric values are what the host sees; they only need to be distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u32);

impl RequestId {
    /// Network picker
    pub const WIFI_PICKER: Self = Self(0);
    /// Account authenticator secondary flow
    pub const ACCOUNT: Self = Self(2);
    /// System settings screen
    pub const SYSTEM_SETTINGS: Self = Self(3);
    /// Captive-portal login / remediation
    pub const CAPTIVE_PORTAL: Self = Self(4);

    /// Human-readable name, used in logs and the console host.
    pub fn name(self) -> &'static str {
        match self {
            Self::WIFI_PICKER => "setup_wifi",
            Self::ACCOUNT => "setup_account",
            Self::SYSTEM_SETTINGS => "setup_settings",
            Self::CAPTIVE_PORTAL => "setup_captive_portal",
            _ => "custom",
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// Outcome code delivered with an external result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultStatus {
    Ok,
    FirstUser,
    Canceled,
    Other(i32),
}

impl ResultStatus {
    pub const CODE_OK: i32 = -1;
    pub const CODE_CANCELED: i32 = 0;
    pub const CODE_FIRST_USER: i32 = 1;

    /// Map a raw host result code onto a status.
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::CODE_OK => Self::Ok,
            Self::CODE_CANCELED => Self::Canceled,
            Self::CODE_FIRST_USER => Self::FirstUser,
            other => Self::Other(other),
        }
    }

    /// Raw host result code.
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => Self::CODE_OK,
            Self::Canceled => Self::CODE_CANCELED,
            Self::FirstUser => Self::CODE_FIRST_USER,
            Self::Other(code) => code,
        }
    }

    /// `OK` and `FIRST_USER` both count as success.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::FirstUser)
    }

    /// A cancel surfaces as [`WizardError::UserCanceled`]; every other code
    /// passes through.
    pub fn check(self) -> Result<Self, WizardError> {
        match self {
            Self::Canceled => Err(WizardError::UserCanceled),
            other => Ok(other),
        }
    }

    /// Default archetype rule: success and unknown codes advance, cancel retreats.
    pub fn resolution(self) -> Resolution {
        match self.check() {
            Err(e) if e.is_user_canceled() => Resolution::Retreat,
            _ => Resolution::Advance,
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::FirstUser => write!(f, "FIRST_USER"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Other(code) => write!(f, "OTHER({})", code),
        }
    }
}

impl FromStr for ResultStatus {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ok" => Ok(Self::Ok),
            "first" | "first_user" => Ok(Self::FirstUser),
            "cancel" | "canceled" | "cancelled" => Ok(Self::Canceled),
            other => other
                .parse::<i32>()
                .map(Self::from_code)
                .map_err(|_| WizardError::general(format!("Unknown result status: {}", s))),
        }
    }
}

/// Which way a resolved sub-flow moves the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Advance,
    Retreat,
}

/// Description of a platform sub-flow for the host to start.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExternalIntent {
    pub action: String,
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
}

impl ExternalIntent {
    pub const PICK_WIFI: &'static str = "setupwizard.action.PICK_WIFI";
    pub const CAPTIVE_PORTAL_LOGIN: &'static str = "setupwizard.action.CAPTIVE_PORTAL_LOGIN";

    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            extras: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

/// A result delivered by the host for a previously started sub-flow.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalResult {
    pub request: RequestId,
    pub status: ResultStatus,
    pub payload: Option<serde_json::Value>,
}

impl ExternalResult {
    pub fn new(request: RequestId, status: ResultStatus) -> Self {
        Self {
            request,
            status,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Output of work run off the navigation thread, posted back to the page
/// that requested it.
#[derive(Debug)]
pub enum WorkerResult {
    CaptivePortal(ProbeVerdict),
    Account(Result<AuthenticatorResponse, WizardError>),
}

/// Sub-flow state of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "request", rename_all = "snake_case")]
pub enum SubFlowState {
    #[default]
    Idle,
    /// Waiting on worker-thread work
    Working,
    /// Waiting on the host to deliver the result for a request
    Dispatching(RequestId),
    Advancing,
    Retreating,
}

/// Per-page sub-flow tracker.
///
/// Serializable so a page restored mid-flow still accepts the result
/// of the request it started before the restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubFlow {
    state: SubFlowState,
}

impl SubFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubFlowState {
        self.state
    }

    /// Forget any pending work. Called when the page is mounted again.
    pub fn reset(&mut self) {
        self.state = SubFlowState::Idle;
    }

    pub fn begin_work(&mut self) {
        self.state = SubFlowState::Working;
    }

    pub fn dispatch(&mut self, request: RequestId) {
        self.state = SubFlowState::Dispatching(request);
    }

    pub fn is_working(&self) -> bool {
        self.state == SubFlowState::Working
    }

    pub fn is_awaiting(&self, request: RequestId) -> bool {
        self.state == SubFlowState::Dispatching(request)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SubFlowState::Advancing | SubFlowState::Retreating)
    }

    /// Consume the pending request if it matches. Returns false for stale or
    /// duplicate results, which the caller must then ignore.
    pub fn take(&mut self, request: RequestId) -> bool {
        if self.is_awaiting(request) {
            self.state = SubFlowState::Idle;
            true
        } else {
            false
        }
    }

    /// Consume pending worker work.
    pub fn take_work(&mut self) -> bool {
        if self.is_working() {
            self.state = SubFlowState::Idle;
            true
        } else {
            false
        }
    }

    pub fn finish(&mut self, resolution: Resolution) {
        self.state = match resolution {
            Resolution::Advance => SubFlowState::Advancing,
            Resolution::Retreat => SubFlowState::Retreating,
        };
    }
}
