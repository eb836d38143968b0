//! Wizard data: registry, cursor, listeners.
//!
//! The cursor is a registry position. Visibility is evaluated live against
//! the platform each time it is asked for, so a page that becomes hidden or
//! visible between moves is picked up on the next move.

use std::fmt;
use std::sync::Arc;

use super::persistence::{PageRecord, WizardSnapshot};
use crate::error::WizardError;
use crate::host::Platform;
use crate::page::Page;
use crate::registry::PageRegistry;

/// Observer of wizard data changes. Called on the navigation thread.
pub trait WizardListener {
    fn on_page_loaded(&mut self, page: &Page);

    fn on_page_tree_changed(&mut self);

    fn on_finished(&mut self) {}
}

/// Handle returned by [`WizardData::register_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What `load` had to fix up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Saved page keys no longer in the registry
    pub dropped_keys: Vec<String>,
    /// Pages whose payload failed to load
    pub rejected_payloads: Vec<String>,
    pub cursor_clamped: bool,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_keys.is_empty() && self.rejected_payloads.is_empty() && !self.cursor_clamped
    }
}

pub struct WizardData {
    registry: PageRegistry,
    cursor: usize,
    platform: Arc<dyn Platform>,
    listeners: Vec<(ListenerId, Box<dyn WizardListener>)>,
    next_listener: u64,
}

impl WizardData {
    pub fn new(registry: PageRegistry, platform: Arc<dyn Platform>) -> Self {
        Self {
            registry,
            cursor: 0,
            platform,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn registry(&self) -> &PageRegistry {
        &self.registry
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    pub(crate) fn platform_handle(&self) -> Arc<dyn Platform> {
        Arc::clone(&self.platform)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, position: usize) {
        debug_assert!(position < self.registry.len());
        self.cursor = position.min(self.registry.len().saturating_sub(1));
    }

    pub fn current_page(&self) -> &Page {
        // The cursor is kept in range by set_cursor and load.
        &self.registry.as_slice()[self.cursor]
    }

    pub(crate) fn current_page_mut(&mut self) -> Option<&mut Page> {
        self.registry.at_mut(self.cursor)
    }

    pub fn page(&self, key: &str) -> Option<&Page> {
        self.registry.get(key)
    }

    pub fn page_at(&self, position: usize) -> Option<&Page> {
        self.registry.at(position)
    }

    pub fn is_visible(&self, position: usize) -> bool {
        self.registry
            .at(position)
            .is_some_and(|p| !p.is_hidden(self.platform.as_ref()))
    }

    /// First visible page strictly after `position`.
    pub fn next_visible(&self, position: usize) -> Option<usize> {
        (position + 1..self.registry.len()).find(|&i| self.is_visible(i))
    }

    /// Last visible page strictly before `position`.
    pub fn previous_visible(&self, position: usize) -> Option<usize> {
        (0..position).rev().find(|&i| self.is_visible(i))
    }

    pub fn is_first_page(&self) -> bool {
        self.previous_visible(self.cursor).is_none()
    }

    pub fn is_last_page(&self) -> bool {
        self.next_visible(self.cursor).is_none()
    }

    /// Keys of the pages that are currently visible, in order.
    pub fn visible_keys(&self) -> Vec<String> {
        (0..self.registry.len())
            .filter(|&i| self.is_visible(i))
            .filter_map(|i| self.registry.at(i).map(|p| p.key().to_string()))
            .collect()
    }

    /// Move off a hidden current page: forward first, then backward. Returns
    /// true if the cursor moved. With no visible page at all it stays put.
    pub(crate) fn settle(&mut self) -> bool {
        if self.is_visible(self.cursor) {
            return false;
        }
        let target = self
            .next_visible(self.cursor)
            .or_else(|| self.previous_visible(self.cursor));
        match target {
            Some(position) => {
                tracing::debug!("Cursor settled from hidden page {} to {}", self.cursor, position);
                self.cursor = position;
                true
            }
            None => {
                tracing::warn!("No visible page in the registry");
                false
            }
        }
    }

    pub fn register_listener(&mut self, listener: Box<dyn WizardListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unregister_listener(&mut self, id: ListenerId) -> Option<Box<dyn WizardListener>> {
        let index = self.listeners.iter().position(|(lid, _)| *lid == id)?;
        Some(self.listeners.remove(index).1)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn notify_page_loaded(&mut self) {
        let Some(page) = self.registry.at(self.cursor) else {
            return;
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_page_loaded(page);
        }
    }

    pub(crate) fn notify_page_tree_changed(&mut self) {
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_page_tree_changed();
        }
    }

    pub(crate) fn notify_finished(&mut self) {
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_finished();
        }
    }

    /// Only way to clear a completion flag.
    pub(crate) fn reset_completion(&mut self, key: &str) -> bool {
        match self.registry.get_mut(key) {
            Some(page) => {
                page.set_completed(false);
                true
            }
            None => false,
        }
    }

    pub fn save(&self) -> WizardSnapshot {
        let pages = self
            .registry
            .iter()
            .map(|page| {
                (
                    page.key().to_string(),
                    PageRecord {
                        completed: page.is_completed(),
                        extra: page.handler().save(),
                    },
                )
            })
            .collect();

        WizardSnapshot {
            cursor: self.cursor as i64,
            pages,
        }
    }

    /// Apply a snapshot. Pages missing from it end up not completed; keys
    /// the registry does not know are dropped; the cursor is clamped.
    pub fn load(&mut self, snapshot: &WizardSnapshot) -> RestoreReport {
        let mut report = RestoreReport::default();

        for page in self.registry.iter_mut() {
            page.set_completed(false);
        }

        for (key, record) in &snapshot.pages {
            let Some(page) = self.registry.get_mut(key) else {
                let err = WizardError::restore_mismatch(format!("unknown page key {:?}", key));
                tracing::warn!("{}, dropping its state", err);
                report.dropped_keys.push(key.clone());
                continue;
            };

            page.set_completed(record.completed);
            if let Some(extra) = &record.extra {
                if let Err(e) = page.handler_mut().load(extra) {
                    tracing::warn!("Page {} rejected its saved payload: {}", key, e);
                    report.rejected_payloads.push(key.clone());
                }
            }
        }

        let last = self.registry.len() as i64 - 1;
        let cursor = snapshot.cursor.clamp(0, last.max(0));
        if cursor != snapshot.cursor {
            let err = WizardError::host_contract(format!(
                "saved cursor {} outside 0..{}",
                snapshot.cursor,
                self.registry.len()
            ));
            tracing::warn!("{}, clamped to {}", err, cursor);
            report.cursor_clamped = true;
        }
        self.cursor = cursor as usize;

        report
    }

    /// Run every page's finalize hook in registry order. Failures are
    /// logged and skipped. Returns the number of failures.
    pub fn finish_pages(&mut self) -> usize {
        let platform = Arc::clone(&self.platform);
        let mut failures = 0;
        for page in self.registry.iter_mut() {
            let key = page.key().to_string();
            if let Err(e) = page.handler_mut().finalize(platform.as_ref()) {
                tracing::error!("Finalize failed for page {}: {}", key, e);
                failures += 1;
            }
        }
        failures
    }
}

impl fmt::Debug for WizardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardData")
            .field("cursor", &self.cursor)
            .field("pages", &self.registry.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
