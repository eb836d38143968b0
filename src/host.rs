//! Host seams
//!
//! The wizard runs inside some host (a window, a terminal, a test harness).
//! [`HostShell`] is everything the engine needs from the UI around it;
//! [`Platform`] is everything it needs from the device (settings,
//! broadcasts). Both are injected, never looked up globally.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{Result, WizardError};
use crate::page::{Page, PageView, ResourceId};
use crate::scheduler::FinishHandle;
use crate::subflow::{ExternalIntent, RequestId};

/// Styling of the button bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTheme {
    Standard,
    /// Used on the last visible page
    Final,
}

/// Chrome state for the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonBar {
    pub next_label: ResourceId,
    /// `None` renders a chevron-only button
    pub prev_label: Option<ResourceId>,
    pub prev_visible: bool,
    pub prev_chevron: bool,
    pub theme: ButtonTheme,
}

impl ButtonBar {
    /// Derive the bar for `page` given its place among visible pages.
    pub fn for_page(page: &Page, is_first: bool, is_last: bool) -> Self {
        Self {
            next_label: page.next_button_title_id(),
            prev_label: page.prev_button_title_id(),
            prev_visible: !is_last,
            prev_chevron: !is_first,
            theme: if is_last {
                ButtonTheme::Final
            } else {
                ButtonTheme::Standard
            },
        }
    }
}

/// Contract the surrounding UI must satisfy.
///
/// Called only on the navigation thread.
pub trait HostShell {
    /// Begin a platform sub-flow. The result must later be delivered through
    /// `Wizard::on_external_result` with the same `request`.
    fn start_external_flow(&mut self, intent: &ExternalIntent, request: RequestId) -> Result<()>;

    /// Mount a page view in the content slot.
    fn show_page(&mut self, view: PageView);

    fn set_button_bar(&mut self, bar: ButtonBar);

    /// Play the wizard-complete transition, then call `done.complete()`.
    fn animate_finish(&mut self, done: FinishHandle);

    /// Toggle button-bar interactivity while an action is in flight.
    fn enable_chrome(&mut self, enabled: bool);
}

/// Device-side services.
pub trait Platform: Send + Sync {
    fn get_setting(&self, name: &str) -> Option<String>;

    fn put_setting(&self, name: &str, value: &str) -> Result<()>;

    fn send_broadcast(&self, name: &str) -> Result<()>;
}

/// In-memory platform. Useful for tests and for hosts without a settings store.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    settings: Mutex<BTreeMap<String, String>>,
    broadcasts: Mutex<Vec<String>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setting(self, name: &str, value: &str) -> Self {
        if let Ok(mut settings) = self.settings.lock() {
            settings.insert(name.to_string(), value.to_string());
        }
        self
    }

    /// Broadcasts sent so far, oldest first.
    pub fn broadcasts(&self) -> Vec<String> {
        self.broadcasts
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }

    pub fn settings(&self) -> BTreeMap<String, String> {
        self.settings
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl Platform for MemoryPlatform {
    fn get_setting(&self, name: &str) -> Option<String> {
        self.settings.lock().ok()?.get(name).cloned()
    }

    fn put_setting(&self, name: &str, value: &str) -> Result<()> {
        self.settings
            .lock()
            .map_err(|e| WizardError::general(format!("settings lock poisoned: {}", e)))?
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn send_broadcast(&self, name: &str) -> Result<()> {
        self.broadcasts
            .lock()
            .map_err(|e| WizardError::general(format!("broadcast lock poisoned: {}", e)))?
            .push(name.to_string());
        Ok(())
    }
}
