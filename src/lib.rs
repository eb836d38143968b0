//! Setup Wizard Library
//!
//! Engine for a first-boot setup wizard: page registry, navigation
//! controller, serializable wizard state, and the adapter that folds
//! asynchronous sub-flows (account creation, captive-portal checks, system
//! settings screens) into turn-based navigation.

pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod host;
pub mod page;
pub mod pages;
pub mod registry;
pub mod scheduler;
pub mod subflow;
pub mod wizard;

// Re-export main types for convenience
pub use config::{ProbeConfig, WizardConfig};
pub use error::{Result, WizardError};
pub use host::{ButtonBar, ButtonTheme, HostShell, MemoryPlatform, Platform};
pub use page::{Direction, Page, PageAction, PageContext, PageHandler, PageInput, PageTitles, PageView};
pub use registry::PageRegistry;
pub use scheduler::{FinishHandle, InlineScheduler, Scheduler, ThreadScheduler};
pub use subflow::{ExternalIntent, ExternalResult, RequestId, ResultStatus};
pub use wizard::{Phase, SavedState, Wizard, WizardListener};
