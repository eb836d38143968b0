//! External account authenticator seam.
//!
//! Adding an account is a two-step affair: the authenticator call (slow,
//! IPC-heavy, runs on a worker) hands back an intent describing the
//! authenticator's own screens, which the host then starts as a sub-flow.

use serde::{Deserialize, Serialize};

use super::ExternalIntent;
use crate::error::WizardError;

/// Options passed to the authenticator for a first-run account add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOptions {
    pub first_run: bool,
    pub allow_skip: bool,
    pub use_immersive: bool,
}

impl AccountOptions {
    pub fn first_run() -> Self {
        Self {
            first_run: true,
            allow_skip: true,
            use_immersive: true,
        }
    }
}

/// What the authenticator yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticatorResponse {
    /// Show this secondary flow
    Intent(ExternalIntent),
    /// The authenticator is handling it without our help; wait for the user
    InProgress,
}

/// External authenticator for one account type.
pub trait Authenticator: Send + Sync {
    /// Whether an authenticator for this account type is installed at all.
    fn is_available(&self) -> bool;

    /// Start an account add. Called off the navigation thread.
    fn add_account(&self, options: AccountOptions) -> Result<AuthenticatorResponse, WizardError>;

    /// Whether an account of this type now exists on the device.
    fn account_exists(&self) -> bool;
}

/// Authenticator for devices with no account provider installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuthenticator;

impl Authenticator for NoAuthenticator {
    fn is_available(&self) -> bool {
        false
    }

    fn add_account(&self, _options: AccountOptions) -> Result<AuthenticatorResponse, WizardError> {
        Err(WizardError::external_unavailable("no account authenticator installed"))
    }

    fn account_exists(&self) -> bool {
        false
    }
}
