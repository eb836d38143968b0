//! Error handling for the setup wizard
//!
//! Centralized error type built with thiserror. Navigation itself never
//! surfaces these to the host: they are logged and folded into the
//! navigation outcome. Only registry construction and file I/O return them.

use thiserror::Error;

/// Main error type for the setup wizard
#[derive(Error, Debug)]
pub enum WizardError {
    /// The user backed out of a sub-flow. Routed to `PREVIOUS`, never a failure.
    #[error("Canceled by user")]
    UserCanceled,

    /// An external sub-flow could not be started (no authenticator, no handler)
    #[error("External flow unavailable: {0}")]
    ExternalUnavailable(String),

    /// Probe I/O failure. Folded into "not captive".
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// Restored state references a page that no longer exists
    #[error("State restore mismatch: {0}")]
    StateRestoreMismatch(String),

    /// Host delivered impossible state (e.g. cursor out of range)
    #[error("Host contract violation: {0}")]
    HostContractViolation(String),

    /// Registry construction errors (empty, duplicate keys)
    #[error("Registry error: {0}")]
    Registry(String),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors (state file, settings file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for wizard operations
pub type Result<T> = std::result::Result<T, WizardError>;

impl WizardError {
    /// Create an external-unavailable error
    pub fn external_unavailable(msg: impl Into<String>) -> Self {
        Self::ExternalUnavailable(msg.into())
    }

    /// Create a transient network error
    pub fn transient_network(msg: impl Into<String>) -> Self {
        Self::TransientNetwork(msg.into())
    }

    /// Create a state restore mismatch error
    pub fn restore_mismatch(msg: impl Into<String>) -> Self {
        Self::StateRestoreMismatch(msg.into())
    }

    /// Create a host contract violation error
    pub fn host_contract(msg: impl Into<String>) -> Self {
        Self::HostContractViolation(msg.into())
    }

    /// Create a registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }

    /// True for errors that only mean "the user went back"
    pub fn is_user_canceled(&self) -> bool {
        matches!(self, Self::UserCanceled)
    }
}
