//! Wizard controller
//!
//! Owns the [`WizardData`] and drives navigation. Every public operation is
//! turned into a [`Command`] on a pending queue which is drained serially on
//! the navigation thread. Page handlers never see the wizard; they request
//! effects through a [`PageContext`] and the controller applies them after
//! the handler returns. Follow-up work (a page advancing itself, `LOAD` on a
//! newly mounted page) is queued, so no handler ever runs inside another.
//!
//! # Lifecycle
//!
//! ```text
//! Created --start/restore--> Running --finish--> Finishing --animation done--> Finished
//!    |                          |
//!    +------- guest / already provisioned -------------------------------------> Finished
//!                               |
//!                               +--teardown--> TornDown
//! ```
//!
//! Results from workers and the finish animation arrive as tasks on the
//! navigation queue and are processed by [`Wizard::pump`]. Each carries the
//! generation it was issued under; teardown bumps the generation so late
//! results are dropped.

pub mod data;
pub mod persistence;

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use crate::config::{
    ACTION_SETUP_FINISHED, SETTING_DEVICE_PROVISIONED, SETTING_USER_SETUP_COMPLETE,
};
use crate::error::{Result, WizardError};
use crate::host::{ButtonBar, HostShell, Platform};
use crate::page::{Direction, Effect, Page, PageAction, PageContext, PageHandler, PageInput};
use crate::registry::PageRegistry;
use crate::scheduler::{FinishHandle, NavigationPoster, NavigationQueue, Scheduler};
use crate::subflow::{ExternalResult, RequestId, WorkerResult};

pub use data::{ListenerId, RestoreReport, WizardData, WizardListener};
pub use persistence::{PageRecord, SavedState, WizardSnapshot};

/// Lifecycle phase of a wizard session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Running,
    /// Finish animation in progress
    Finishing,
    Finished,
    TornDown,
}

#[derive(Debug)]
enum Command {
    /// Mount the current page, optionally firing `LOAD` afterwards
    Mount { fire_load: bool },
    Action(PageAction),
    /// Page-requested move, valid only while the cursor is still at `from`
    Move { direction: Direction, from: usize },
    ExternalResult(ExternalResult),
    WorkerResult { page: String, result: WorkerResult },
    FlowUnavailable {
        page: String,
        request: RequestId,
        error: WizardError,
    },
    Input(PageInput),
    EnvironmentChanged,
}

/// The setup wizard controller.
///
/// Build one with [`Wizard::new`], then call [`Wizard::start`] or
/// [`Wizard::restore`] exactly once. Host events (`on_next_page`,
/// `on_external_result`, ...) may arrive at any time afterwards; results
/// posted from other threads only take effect on the next [`Wizard::pump`].
pub struct Wizard {
    data: WizardData,
    host: Box<dyn HostShell>,
    scheduler: Arc<dyn Scheduler>,
    queue: NavigationQueue,
    pending: VecDeque<Command>,
    dispatching: bool,
    direction: Direction,
    generation: u64,
    guest_user: bool,
    phase: Phase,
}

impl Wizard {
    pub fn new(
        registry: PageRegistry,
        host: Box<dyn HostShell>,
        platform: Arc<dyn Platform>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            data: WizardData::new(registry, platform),
            host,
            scheduler,
            queue: NavigationQueue::new(),
            pending: VecDeque::new(),
            dispatching: false,
            direction: Direction::Forward,
            generation: 0,
            guest_user: false,
            phase: Phase::Created,
        }
    }

    /// Guest sessions finish immediately and never broadcast.
    pub fn with_guest_user(mut self, guest_user: bool) -> Self {
        self.guest_user = guest_user;
        self
    }

    pub fn data(&self) -> &WizardData {
        &self.data
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn current_page(&self) -> &Page {
        self.data.current_page()
    }

    pub fn register_listener(&mut self, listener: Box<dyn WizardListener>) -> ListenerId {
        self.data.register_listener(listener)
    }

    pub fn unregister_listener(&mut self, id: ListenerId) -> Option<Box<dyn WizardListener>> {
        self.data.unregister_listener(id)
    }

    /// Handle for posting work back onto this wizard's navigation queue.
    pub fn poster(&self) -> NavigationPoster {
        self.queue.poster()
    }

    /// Begin a fresh session on the first visible page and fire `LOAD`.
    pub fn start(&mut self) {
        if self.phase != Phase::Created {
            tracing::warn!("start() called in phase {:?}, ignoring", self.phase);
            return;
        }
        if self.should_skip_setup() {
            self.finish_setup(false);
            return;
        }

        tracing::info!("Starting setup wizard with {} pages", self.data.registry().len());
        self.phase = Phase::Running;
        self.direction = Direction::Forward;
        self.data.set_cursor(0);
        self.data.settle();
        self.run(Command::Mount { fire_load: true });
    }

    /// Resume a session from a saved blob. The restored page is mounted and
    /// `pageLoaded` re-emitted, but `LOAD` is not fired again so a page
    /// waiting on a sub-flow keeps waiting for it.
    pub fn restore(&mut self, saved: &SavedState) {
        if self.phase != Phase::Created {
            tracing::warn!("restore() called in phase {:?}, ignoring", self.phase);
            return;
        }
        if self.should_skip_setup() {
            self.finish_setup(false);
            return;
        }

        let snapshot = saved.snapshot().unwrap_or_else(|e| {
            let err = WizardError::restore_mismatch(e.to_string());
            tracing::warn!("{}, starting from the first page", err);
            WizardSnapshot::default()
        });
        let report = self.data.load(&snapshot);
        tracing::info!(
            "Restored wizard at page {} ({} dropped keys)",
            self.data.cursor(),
            report.dropped_keys.len()
        );

        self.phase = Phase::Running;
        self.direction = Direction::Forward;
        if report.cursor_clamped {
            self.data.notify_page_tree_changed();
        }
        self.data.settle();
        self.run(Command::Mount { fire_load: false });
    }

    /// Resume from a state file when one exists, otherwise start fresh.
    ///
    /// A file that cannot be read or parsed is logged and ignored; the
    /// session starts from the first page rather than failing to launch.
    pub fn resume_or_start(&mut self, path: Option<&Path>) {
        let Some(path) = path.filter(|path| path.exists()) else {
            self.start();
            return;
        };
        match SavedState::load_from_file(path) {
            Ok(saved) => {
                tracing::info!("Resuming from {:?}", path);
                self.restore(&saved);
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable state file: {:#}", e);
                self.start();
            }
        }
    }

    pub fn save(&self) -> Result<SavedState> {
        SavedState::from_snapshot(&self.data.save())
    }

    pub fn on_next_page(&mut self) {
        self.run(Command::Action(PageAction::Next));
    }

    pub fn on_previous_page(&mut self) {
        self.run(Command::Action(PageAction::Previous));
    }

    /// Hardware back key: same as previous, ignored on the first page.
    pub fn on_back_pressed(&mut self) {
        if self.data.is_first_page() {
            tracing::debug!("Back pressed on first page, ignoring");
            return;
        }
        self.on_previous_page();
    }

    /// Result of a sub-flow started through `HostShell::start_external_flow`.
    pub fn on_external_result(&mut self, result: ExternalResult) {
        self.run(Command::ExternalResult(result));
    }

    /// User input aimed at the current page's own fields.
    pub fn on_input(&mut self, input: PageInput) {
        self.run(Command::Input(input));
    }

    /// Something page visibility depends on changed.
    pub fn on_environment_changed(&mut self) {
        self.run(Command::EnvironmentChanged);
    }

    /// The host came back to the foreground.
    pub fn resume(&mut self) {
        if !self.is_running() || self.dispatching {
            return;
        }
        self.host.enable_chrome(true);
        self.data.notify_page_tree_changed();
        self.refresh_button_bar();
    }

    /// Clear a page's completion flag.
    pub fn reset_page(&mut self, key: &str) -> bool {
        let reset = self.data.reset_completion(key);
        if reset {
            tracing::info!("Page {} reset", key);
        } else {
            tracing::warn!("Cannot reset unknown page {}", key);
        }
        reset
    }

    /// Abandon the session. Pending work and late results are dropped.
    pub fn teardown(&mut self) {
        if self.phase == Phase::TornDown {
            return;
        }
        tracing::info!("Tearing down wizard in phase {:?}", self.phase);
        self.generation += 1;
        self.pending.clear();
        self.phase = Phase::TornDown;
    }

    /// Process tasks posted to the navigation queue. Returns how many ran.
    pub fn pump(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.queue.try_next() {
            task(self);
            ran += 1;
        }
        ran
    }

    pub(crate) fn on_worker_result(&mut self, generation: u64, page: String, result: WorkerResult) {
        if generation != self.generation {
            tracing::debug!("Dropping worker result for {} from an older session", page);
            return;
        }
        self.run(Command::WorkerResult { page, result });
    }

    pub(crate) fn on_finish_animation_done(&mut self, generation: u64) {
        if generation != self.generation || self.phase != Phase::Finishing {
            tracing::debug!("Ignoring finish callback in phase {:?}", self.phase);
            return;
        }
        self.finish_setup(true);
    }

    fn should_skip_setup(&self) -> bool {
        if self.guest_user {
            tracing::info!("Guest session, skipping setup");
            return true;
        }
        if self.data.platform().get_setting(SETTING_USER_SETUP_COMPLETE).as_deref() == Some("1") {
            tracing::info!("User setup already complete, skipping setup");
            return true;
        }
        false
    }

    /// Queue a command and drain the queue unless a drain is already running.
    fn run(&mut self, command: Command) {
        if !self.is_running() {
            tracing::debug!("Ignoring {:?} in phase {:?}", command, self.phase);
            return;
        }
        self.pending.push_back(command);
        if self.dispatching {
            return;
        }

        self.dispatching = true;
        self.host.enable_chrome(false);
        while let Some(command) = self.pending.pop_front() {
            if !self.is_running() {
                self.pending.clear();
                break;
            }
            self.execute(command);
        }
        self.dispatching = false;
        if self.is_running() {
            self.host.enable_chrome(true);
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Mount { fire_load } => {
                self.mount();
                if fire_load {
                    self.pending.push_front(Command::Action(PageAction::Load));
                }
            }
            Command::Action(PageAction::Previous) if self.data.is_first_page() => {
                tracing::debug!("Previous on first page, ignoring");
            }
            Command::Action(action) => {
                tracing::debug!("Dispatching {} to {}", action, self.current_page().key());
                self.dispatch(|handler, ctx| handler.on_action(action, ctx));
            }
            Command::Move { direction, from } => self.move_from(direction, from),
            Command::ExternalResult(result) => {
                let handled = self.dispatch(|handler, ctx| handler.on_external_result(&result, ctx));
                if !handled {
                    tracing::debug!(
                        "{} {} not handled by {}",
                        result.request,
                        result.status,
                        self.current_page().key()
                    );
                }
            }
            Command::WorkerResult { page, result } => {
                if page != self.current_page().key() {
                    tracing::debug!("Dropping worker result for {}, no longer current", page);
                    return;
                }
                self.dispatch(|handler, ctx| handler.on_worker_result(result, ctx));
            }
            Command::FlowUnavailable {
                page,
                request,
                error,
            } => {
                if page != self.current_page().key() {
                    tracing::debug!("Dropping unavailable {} for {}, no longer current", request, page);
                    return;
                }
                self.dispatch(|handler, ctx| handler.on_flow_unavailable(request, &error, ctx));
            }
            Command::Input(input) => {
                if self.dispatch(|handler, ctx| handler.on_input(&input, ctx)) {
                    self.show_current();
                } else {
                    tracing::debug!("Input {:?} not handled by {}", input, self.current_page().key());
                }
            }
            Command::EnvironmentChanged => {
                self.data.notify_page_tree_changed();
                if self.data.is_visible(self.data.cursor()) {
                    self.refresh_button_bar();
                } else {
                    let from = self.data.cursor();
                    tracing::info!("Current page {} became hidden", self.current_page().key());
                    self.pending.push_front(Command::Move {
                        direction: self.direction,
                        from,
                    });
                }
            }
        }
    }

    /// Call into the current page's handler and apply what it requested.
    fn dispatch<R>(&mut self, f: impl FnOnce(&mut dyn PageHandler, &mut PageContext<'_>) -> R) -> R
    where
        R: Default,
    {
        let cursor = self.data.cursor();
        let direction = self.direction;
        let platform = self.data.platform_handle();
        let Some(page) = self.data.current_page_mut() else {
            tracing::error!("Cursor {} has no page", cursor);
            return R::default();
        };
        let key = page.key().to_string();

        let mut ctx = PageContext::new(direction, platform.as_ref());
        let outcome = f(page.handler_mut(), &mut ctx);
        let effects = ctx.into_effects();

        self.apply_effects(cursor, &key, effects);
        outcome
    }

    fn apply_effects(&mut self, cursor: usize, key: &str, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Complete => {
                    if let Some(page) = self.data.current_page_mut() {
                        page.mark_completed();
                    }
                }
                Effect::Advance => self.pending.push_back(Command::Move {
                    direction: Direction::Forward,
                    from: cursor,
                }),
                Effect::Retreat => self.pending.push_back(Command::Move {
                    direction: Direction::Backward,
                    from: cursor,
                }),
                Effect::StartExternalFlow { request, intent } => {
                    tracing::info!("Page {} starting {} ({})", key, request, intent.action);
                    if let Err(error) = self.host.start_external_flow(&intent, request) {
                        let error = match error {
                            WizardError::ExternalUnavailable(_) => error,
                            other => WizardError::external_unavailable(other.to_string()),
                        };
                        tracing::warn!("Host could not start {}: {}", request, error);
                        self.pending.push_back(Command::FlowUnavailable {
                            page: key.to_string(),
                            request,
                            error,
                        });
                    }
                }
                Effect::RunWorker(job) => {
                    let poster = self.queue.poster();
                    let generation = self.generation;
                    let page = key.to_string();
                    tracing::debug!("Page {} queued worker job", page);
                    self.scheduler.run_worker(Box::new(move || {
                        let result = job();
                        let posted = poster.run_on_navigation_thread(move |wizard| {
                            wizard.on_worker_result(generation, page, result)
                        });
                        if !posted {
                            tracing::debug!("Worker finished after wizard was dropped");
                        }
                    }));
                }
            }
        }
    }

    fn move_from(&mut self, direction: Direction, from: usize) {
        if from != self.data.cursor() {
            tracing::debug!(
                "Dropping stale {:?} move from {} (cursor at {})",
                direction,
                from,
                self.data.cursor()
            );
            return;
        }

        let target = match direction {
            Direction::Forward => self.data.next_visible(from),
            Direction::Backward => self.data.previous_visible(from),
        };

        match (target, direction) {
            (Some(position), _) => self.move_to(position, direction),
            (None, Direction::Forward) => self.finish(),
            (None, Direction::Backward) => {
                if self.data.is_visible(from) {
                    tracing::debug!("Already on first page");
                } else if let Some(position) = self.data.next_visible(from) {
                    self.move_to(position, Direction::Forward);
                } else {
                    self.finish();
                }
            }
        }
    }

    fn move_to(&mut self, position: usize, direction: Direction) {
        tracing::info!(
            "Moving {:?} from {} to {}",
            direction,
            self.current_page().key(),
            self.data.page_at(position).map(|p| p.key()).unwrap_or("?")
        );
        self.direction = direction;
        self.data.set_cursor(position);
        self.mount();
        self.pending.push_front(Command::Action(PageAction::Load));
    }

    /// Show the current page, refresh the chrome and emit `pageLoaded`.
    fn mount(&mut self) {
        self.show_current();
        self.refresh_button_bar();
        self.data.notify_page_loaded();
    }

    fn show_current(&mut self) {
        let view = self.current_page().render(self.direction.action());
        self.host.show_page(view);
    }

    fn refresh_button_bar(&mut self) {
        let bar = ButtonBar::for_page(
            self.data.current_page(),
            self.data.is_first_page(),
            self.data.is_last_page(),
        );
        self.host.set_button_bar(bar);
    }

    /// Past the last visible page: hand off to the finish animation.
    fn finish(&mut self) {
        tracing::info!("Last page done, finishing");
        self.phase = Phase::Finishing;
        self.pending.clear();
        let handle = FinishHandle::new(self.queue.poster(), self.generation);
        self.host.animate_finish(handle);
    }

    /// Mark the device set up. Pages are only finalized when the user walked
    /// through them; the skip path leaves their platform settings alone.
    fn finish_setup(&mut self, finalize_pages: bool) {
        if finalize_pages {
            let failures = self.data.finish_pages();
            if failures > 0 {
                tracing::warn!("{} page(s) failed to finalize", failures);
            }
        }

        let platform = self.data.platform_handle();
        if self.guest_user {
            tracing::info!("Guest session, not broadcasting setup completion");
        } else if let Err(e) = platform.send_broadcast(ACTION_SETUP_FINISHED) {
            tracing::error!("Failed to broadcast setup completion: {}", e);
        }

        for setting in [SETTING_DEVICE_PROVISIONED, SETTING_USER_SETUP_COMPLETE] {
            if let Err(e) = platform.put_setting(setting, "1") {
                tracing::error!("Failed to set {}: {}", setting, e);
            }
        }

        self.pending.clear();
        self.phase = Phase::Finished;
        tracing::info!("Setup wizard finished");
        self.data.notify_finished();
    }
}

impl std::fmt::Debug for Wizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("data", &self.data)
            .field("phase", &self.phase)
            .field("direction", &self.direction)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
