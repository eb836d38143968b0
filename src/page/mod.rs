//! Page model
//!
//! A page is a capability record: plain data (key, titles, completion) plus
//! a boxed [`PageHandler`] supplying the behavior. Handlers never hold a
//! reference to the wizard. Every call receives a [`PageContext`] through
//! which the handler *requests* effects (complete, advance, start a
//! sub-flow, run worker work). The controller applies them after the
//! handler returns, so a handler can never re-enter navigation.

pub mod basic;

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

use crate::error::{Result, WizardError};
use crate::host::Platform;
use crate::subflow::{ExternalIntent, ExternalResult, RequestId, WorkerResult};

/// Opaque handle resolved by the host's resource catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub &'static str);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Resource handles used by the built-in pages.
pub mod res {
    use super::ResourceId;

    pub const NEXT: ResourceId = ResourceId("next");
    pub const SKIP: ResourceId = ResourceId("skip");
    pub const START: ResourceId = ResourceId("start");
    pub const LOADING: ResourceId = ResourceId("loading");
    pub const WELCOME: ResourceId = ResourceId("setup_welcome");
    pub const DATE_TIME: ResourceId = ResourceId("setup_datetime");
    pub const SETUP_OTHER: ResourceId = ResourceId("setup_other");
    pub const FINISH: ResourceId = ResourceId("setup_complete");
    pub const BACKUP: ResourceId = ResourceId("backup_toggle");
    pub const LOCATION: ResourceId = ResourceId("location_toggle");
    pub const GPS: ResourceId = ResourceId("gps_toggle");
    pub const NETWORK_LOCATION: ResourceId = ResourceId("network_location_toggle");
}

/// Action delivered to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum PageAction {
    Next,
    Previous,
    /// Fired when a page becomes current
    Load,
}

/// Direction of the last cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// The action a page entered in this direction is rendered for.
    pub fn action(self) -> PageAction {
        match self {
            Self::Forward => PageAction::Next,
            Self::Backward => PageAction::Previous,
        }
    }
}

/// Title handles of a page. `prev = None` means chevron-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTitles {
    pub title: ResourceId,
    pub next: ResourceId,
    pub prev: Option<ResourceId>,
}

impl PageTitles {
    pub fn new(title: ResourceId) -> Self {
        Self {
            title,
            next: res::NEXT,
            prev: None,
        }
    }

    /// Next button reads "skip" on pages whose completion is optional.
    pub fn skippable(title: ResourceId) -> Self {
        Self {
            title,
            next: res::SKIP,
            prev: None,
        }
    }

    pub fn with_next(mut self, next: ResourceId) -> Self {
        self.next = next;
        self
    }

    pub fn with_prev(mut self, prev: ResourceId) -> Self {
        self.prev = Some(prev);
        self
    }
}

/// One toggle row on a settings page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleView {
    pub name: &'static str,
    pub label: ResourceId,
    pub checked: bool,
    pub enabled: bool,
}

/// Content slot of a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBody {
    /// Spinner while a sub-flow runs
    Loading,
    Text(ResourceId),
    Toggles(Vec<ToggleView>),
}

/// What the host mounts in its content slot, tagged by page key so a
/// re-mount can reuse an existing view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub key: String,
    pub title: ResourceId,
    pub action: PageAction,
    pub body: PageBody,
}

/// User input aimed at the current page's own fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageInput {
    Toggle { name: String, enabled: bool },
}

/// Deferred work returning its result to the page that queued it.
pub type WorkerJob = Box<dyn FnOnce() -> WorkerResult + Send + 'static>;

/// Effects a handler requested during one call.
pub(crate) enum Effect {
    Complete,
    Advance,
    Retreat,
    StartExternalFlow {
        request: RequestId,
        intent: ExternalIntent,
    },
    RunWorker(WorkerJob),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "Complete"),
            Self::Advance => write!(f, "Advance"),
            Self::Retreat => write!(f, "Retreat"),
            Self::StartExternalFlow { request, intent } => {
                write!(f, "StartExternalFlow({}, {})", request, intent.action)
            }
            Self::RunWorker(_) => write!(f, "RunWorker"),
        }
    }
}

/// Narrow callback surface handed to a page for the duration of one call.
pub struct PageContext<'a> {
    direction: Direction,
    platform: &'a dyn Platform,
    effects: Vec<Effect>,
}

impl<'a> PageContext<'a> {
    pub(crate) fn new(direction: Direction, platform: &'a dyn Platform) -> Self {
        Self {
            direction,
            platform,
            effects: Vec::new(),
        }
    }

    /// Direction the wizard moved to reach the current page.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform
    }

    /// Mark the page completed.
    pub fn complete(&mut self) {
        self.effects.push(Effect::Complete);
    }

    /// Move to the next visible page, or finish if there is none.
    pub fn advance(&mut self) {
        self.effects.push(Effect::Advance);
    }

    /// Move to the previous visible page.
    pub fn retreat(&mut self) {
        self.effects.push(Effect::Retreat);
    }

    /// Ask the host to start a sub-flow. Its result comes back through
    /// [`PageHandler::on_external_result`]; failure to start comes back
    /// through [`PageHandler::on_flow_unavailable`].
    pub fn start_external_flow(&mut self, request: RequestId, intent: ExternalIntent) {
        self.effects
            .push(Effect::StartExternalFlow { request, intent });
    }

    /// Run `job` off the navigation thread. Its result comes back through
    /// [`PageHandler::on_worker_result`] if this page is still current.
    pub fn run_worker(&mut self, job: impl FnOnce() -> WorkerResult + Send + 'static) {
        self.effects.push(Effect::RunWorker(Box::new(job)));
    }

    pub(crate) fn into_effects(self) -> Vec<Effect> {
        self.effects
    }

    #[cfg(test)]
    pub(crate) fn effect_names(&self) -> Vec<String> {
        self.effects.iter().map(|e| format!("{:?}", e)).collect()
    }
}

/// Standard action semantics: `NEXT` completes and advances, `PREVIOUS`
/// retreats, `LOAD` does nothing.
pub fn default_action(action: PageAction, ctx: &mut PageContext<'_>) {
    match action {
        PageAction::Next => {
            ctx.complete();
            ctx.advance();
        }
        PageAction::Previous => ctx.retreat(),
        PageAction::Load => {}
    }
}

/// Behavior of a page. Every method has the plain-page default.
pub trait PageHandler {
    /// Content for the current action. Pure with respect to wizard state.
    fn render(&self, titles: &PageTitles, _action: PageAction) -> PageBody {
        PageBody::Text(titles.title)
    }

    fn on_action(&mut self, action: PageAction, ctx: &mut PageContext<'_>) {
        default_action(action, ctx);
    }

    /// Returns false when the result was not for this page (or was stale).
    fn on_external_result(&mut self, _result: &ExternalResult, _ctx: &mut PageContext<'_>) -> bool {
        false
    }

    fn on_worker_result(&mut self, _result: WorkerResult, _ctx: &mut PageContext<'_>) -> bool {
        false
    }

    /// The host could not start a requested sub-flow. Default: move on with
    /// the page left incomplete.
    fn on_flow_unavailable(
        &mut self,
        request: RequestId,
        error: &WizardError,
        ctx: &mut PageContext<'_>,
    ) {
        tracing::warn!("Sub-flow {} unavailable: {}", request, error);
        ctx.advance();
    }

    fn on_input(&mut self, _input: &PageInput, _ctx: &mut PageContext<'_>) -> bool {
        false
    }

    fn is_hidden(&self, _platform: &dyn Platform) -> bool {
        false
    }

    /// Page-owned opaque payload for save/restore.
    fn save(&self) -> Option<serde_json::Value> {
        None
    }

    fn load(&mut self, _extra: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    /// Persist page state to the platform once the wizard finishes.
    fn finalize(&mut self, _platform: &dyn Platform) -> Result<()> {
        Ok(())
    }
}

/// A unit of wizard progression.
pub struct Page {
    key: String,
    titles: PageTitles,
    completed: bool,
    handler: Box<dyn PageHandler>,
}

impl Page {
    pub fn new(key: impl Into<String>, titles: PageTitles, handler: Box<dyn PageHandler>) -> Self {
        Self {
            key: key.into(),
            titles,
            completed: false,
            handler,
        }
    }

    /// A page with default behavior throughout.
    pub fn simple(key: impl Into<String>, titles: PageTitles) -> Self {
        Self::new(key, titles, Box::new(basic::BasicPage))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn titles(&self) -> &PageTitles {
        &self.titles
    }

    pub fn title_id(&self) -> ResourceId {
        self.titles.title
    }

    pub fn next_button_title_id(&self) -> ResourceId {
        self.titles.next
    }

    pub fn prev_button_title_id(&self) -> Option<ResourceId> {
        self.titles.prev
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_hidden(&self, platform: &dyn Platform) -> bool {
        self.handler.is_hidden(platform)
    }

    pub fn render(&self, action: PageAction) -> PageView {
        PageView {
            key: self.key.clone(),
            title: self.titles.title,
            action,
            body: self.handler.render(&self.titles, action),
        }
    }

    /// Completion only ever moves false -> true here.
    pub(crate) fn mark_completed(&mut self) {
        if !self.completed {
            tracing::debug!("Page {} completed", self.key);
        }
        self.completed = true;
    }

    /// Explicit reset, or a value coming from a restored snapshot.
    pub(crate) fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    pub(crate) fn handler(&self) -> &dyn PageHandler {
        self.handler.as_ref()
    }

    pub(crate) fn handler_mut(&mut self) -> &mut dyn PageHandler {
        self.handler.as_mut()
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("key", &self.key)
            .field("titles", &self.titles)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}
