//! Shared stubs for the integration tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use setupwizard::error::{Result, WizardError};
use setupwizard::host::{ButtonBar, HostShell, MemoryPlatform, Platform};
use setupwizard::page::{Page, PageAction, PageView};
use setupwizard::registry::PageRegistry;
use setupwizard::scheduler::{FinishHandle, InlineScheduler, Scheduler, WorkerTask};
use setupwizard::subflow::account::{AccountOptions, Authenticator, AuthenticatorResponse};
use setupwizard::subflow::probe::{ProbeVerdict, Prober};
use setupwizard::subflow::{ExternalIntent, ExternalResult, RequestId, ResultStatus};
use setupwizard::wizard::{Wizard, WizardListener};

/// Everything the recording host saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Show(String, PageAction),
    Bar(ButtonBar),
    Start(RequestId),
    Chrome(bool),
    AnimateFinish,
}

#[derive(Default)]
pub struct HostLog {
    pub events: Vec<HostEvent>,
    pub views: Vec<PageView>,
    pub intents: Vec<ExternalIntent>,
    /// Held finish callbacks when auto-finish is off
    pub finish_handles: Vec<FinishHandle>,
}

impl HostLog {
    pub fn started(&self) -> Vec<RequestId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Start(request) => Some(*request),
                _ => None,
            })
            .collect()
    }

    pub fn chrome(&self) -> Vec<bool> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Chrome(enabled) => Some(*enabled),
                _ => None,
            })
            .collect()
    }

    pub fn last_bar(&self) -> Option<ButtonBar> {
        self.events.iter().rev().find_map(|e| match e {
            HostEvent::Bar(bar) => Some(*bar),
            _ => None,
        })
    }
}

/// Host shell that records every call.
pub struct RecordingHost {
    log: Arc<Mutex<HostLog>>,
    unavailable: HashSet<RequestId>,
    auto_finish: bool,
}

impl RecordingHost {
    pub fn new() -> (Self, Arc<Mutex<HostLog>>) {
        let log = Arc::new(Mutex::new(HostLog::default()));
        (
            Self {
                log: Arc::clone(&log),
                unavailable: HashSet::new(),
                auto_finish: true,
            },
            log,
        )
    }

    /// Refuse to start `request`.
    pub fn without(mut self, request: RequestId) -> Self {
        self.unavailable.insert(request);
        self
    }

    /// Hold finish callbacks in the log instead of completing them.
    pub fn manual_finish(mut self) -> Self {
        self.auto_finish = false;
        self
    }
}

impl HostShell for RecordingHost {
    fn start_external_flow(&mut self, intent: &ExternalIntent, request: RequestId) -> Result<()> {
        if self.unavailable.contains(&request) {
            return Err(WizardError::external_unavailable(format!(
                "nothing handles {}",
                intent.action
            )));
        }
        let mut log = self.log.lock().unwrap();
        log.events.push(HostEvent::Start(request));
        log.intents.push(intent.clone());
        Ok(())
    }

    fn show_page(&mut self, view: PageView) {
        let mut log = self.log.lock().unwrap();
        log.events.push(HostEvent::Show(view.key.clone(), view.action));
        log.views.push(view);
    }

    fn set_button_bar(&mut self, bar: ButtonBar) {
        self.log.lock().unwrap().events.push(HostEvent::Bar(bar));
    }

    fn animate_finish(&mut self, done: FinishHandle) {
        let mut log = self.log.lock().unwrap();
        log.events.push(HostEvent::AnimateFinish);
        if self.auto_finish {
            done.complete();
        } else {
            log.finish_handles.push(done);
        }
    }

    fn enable_chrome(&mut self, enabled: bool) {
        self.log.lock().unwrap().events.push(HostEvent::Chrome(enabled));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Loaded(String),
    TreeChanged,
    Finished,
}

pub struct RecordingListener(pub Arc<Mutex<Vec<ListenerEvent>>>);

impl WizardListener for RecordingListener {
    fn on_page_loaded(&mut self, page: &Page) {
        self.0
            .lock()
            .unwrap()
            .push(ListenerEvent::Loaded(page.key().to_string()));
    }

    fn on_page_tree_changed(&mut self) {
        self.0.lock().unwrap().push(ListenerEvent::TreeChanged);
    }

    fn on_finished(&mut self) {
        self.0.lock().unwrap().push(ListenerEvent::Finished);
    }
}

/// Prober with a fixed answer that counts its calls.
pub struct FixedProber {
    verdict: ProbeVerdict,
    calls: AtomicUsize,
}

impl FixedProber {
    pub fn new(verdict: ProbeVerdict) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Prober for FixedProber {
    fn probe(&self) -> ProbeVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Intent,
    InProgress,
    Fail,
}

pub struct StubAuthenticator {
    pub available: bool,
    pub exists: bool,
    pub mode: AuthMode,
}

impl StubAuthenticator {
    pub fn ready() -> Arc<Self> {
        Arc::new(Self {
            available: true,
            exists: true,
            mode: AuthMode::Intent,
        })
    }

    pub fn with_mode(mode: AuthMode) -> Arc<Self> {
        Arc::new(Self {
            available: true,
            exists: true,
            mode,
        })
    }

    pub fn missing() -> Arc<Self> {
        Arc::new(Self {
            available: false,
            exists: false,
            mode: AuthMode::Fail,
        })
    }
}

impl Authenticator for StubAuthenticator {
    fn is_available(&self) -> bool {
        self.available
    }

    fn add_account(&self, _options: AccountOptions) -> Result<AuthenticatorResponse> {
        match self.mode {
            AuthMode::Intent => Ok(AuthenticatorResponse::Intent(ExternalIntent::new(
                "test.ADD_ACCOUNT",
            ))),
            AuthMode::InProgress => Ok(AuthenticatorResponse::InProgress),
            AuthMode::Fail => Err(WizardError::external_unavailable("authenticator gone")),
        }
    }

    fn account_exists(&self) -> bool {
        self.exists
    }
}

/// A wizard wired to recording stubs.
pub struct Harness {
    pub wizard: Wizard,
    pub host: Arc<Mutex<HostLog>>,
    pub events: Arc<Mutex<Vec<ListenerEvent>>>,
    pub platform: Arc<MemoryPlatform>,
}

pub struct HarnessOptions {
    pub platform: MemoryPlatform,
    pub scheduler: Arc<dyn Scheduler>,
    pub host: Option<RecordingHost>,
    pub guest: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            platform: MemoryPlatform::new(),
            scheduler: Arc::new(InlineScheduler),
            host: None,
            guest: false,
        }
    }
}

impl Harness {
    pub fn new(pages: Vec<Page>) -> Self {
        Self::build(pages, HarnessOptions::default())
    }

    pub fn build(pages: Vec<Page>, options: HarnessOptions) -> Self {
        let (host, log) = match options.host {
            Some(host) => {
                let log = Arc::clone(&host.log);
                (host, log)
            }
            None => RecordingHost::new(),
        };
        let platform = Arc::new(options.platform);
        let registry = PageRegistry::new(pages).expect("valid registry");

        let mut wizard = Wizard::new(
            registry,
            Box::new(host),
            Arc::clone(&platform) as Arc<dyn Platform>,
            options.scheduler,
        )
        .with_guest_user(options.guest);

        let events = Arc::new(Mutex::new(Vec::new()));
        wizard.register_listener(Box::new(RecordingListener(Arc::clone(&events))));

        Self {
            wizard,
            host: log,
            events,
            platform,
        }
    }

    /// Start and process whatever the first page queued.
    pub fn start(mut self) -> Self {
        self.wizard.start();
        self.wizard.pump();
        self
    }

    pub fn key(&self) -> String {
        self.wizard.current_page().key().to_string()
    }

    pub fn next(&mut self) {
        self.wizard.on_next_page();
        self.wizard.pump();
    }

    pub fn previous(&mut self) {
        self.wizard.on_previous_page();
        self.wizard.pump();
    }

    pub fn result(&mut self, request: RequestId, status: ResultStatus) {
        self.wizard
            .on_external_result(ExternalResult::new(request, status));
        self.wizard.pump();
    }

    pub fn completed(&self, key: &str) -> bool {
        self.wizard
            .data()
            .page(key)
            .map(|p| p.is_completed())
            .unwrap_or(false)
    }

    pub fn loaded(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ListenerEvent::Loaded(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn listener_events(&self) -> Vec<ListenerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<RequestId> {
        self.host.lock().unwrap().started()
    }

    pub fn chrome(&self) -> Vec<bool> {
        self.host.lock().unwrap().chrome()
    }
}

/// Holds worker tasks until the test runs them.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<VecDeque<WorkerTask>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Run everything queued so far. Returns how many tasks ran.
    pub fn run_pending(&self) -> usize {
        let tasks: Vec<WorkerTask> = self.queue.lock().unwrap().drain(..).collect();
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

impl Scheduler for ManualScheduler {
    fn run_worker(&self, task: WorkerTask) {
        self.queue.lock().unwrap().push_back(task);
    }
}
