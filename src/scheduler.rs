//! Scheduling between the navigation thread and workers
//!
//! All wizard state lives on the navigation thread. Long-running work
//! (probe, authenticator IPC) goes to a [`Scheduler`]; its result travels
//! back as a task on the [`NavigationQueue`], which the host drains by
//! calling `Wizard::pump()` from its event loop. The engine never spawns a
//! thread itself.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::wizard::Wizard;

/// Work to run off the navigation thread.
pub type WorkerTask = Box<dyn FnOnce() + Send + 'static>;

/// Work to run on the navigation thread with the wizard in hand.
pub type NavigationTask = Box<dyn FnOnce(&mut Wizard) + Send + 'static>;

/// Runs worker tasks somewhere other than the navigation thread.
pub trait Scheduler: Send + Sync {
    fn run_worker(&self, task: WorkerTask);
}

/// One named OS thread per task.
#[derive(Debug, Default)]
pub struct ThreadScheduler {
    spawned: AtomicUsize,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for ThreadScheduler {
    fn run_worker(&self, task: WorkerTask) {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let spawned = thread::Builder::new()
            .name(format!("wizard-worker-{}", n))
            .spawn(task);
        if let Err(e) = spawned {
            // The page stays on screen; the user can still skip or go back.
            tracing::error!("Failed to spawn wizard worker: {}", e);
        }
    }
}

/// Runs the task immediately on the calling thread. The result still goes
/// through the navigation queue, so it is only seen on the next `pump()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn run_worker(&self, task: WorkerTask) {
        task();
    }
}

/// Mailbox of tasks bound for the navigation thread.
pub struct NavigationQueue {
    tx: Sender<NavigationTask>,
    rx: Receiver<NavigationTask>,
}

impl NavigationQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn poster(&self) -> NavigationPoster {
        NavigationPoster {
            tx: self.tx.clone(),
        }
    }

    pub(crate) fn try_next(&self) -> Option<NavigationTask> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for NavigationQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle for posting work back to the navigation thread.
#[derive(Clone)]
pub struct NavigationPoster {
    tx: Sender<NavigationTask>,
}

impl NavigationPoster {
    /// Queue `task` for the next `Wizard::pump()`. Returns false once the
    /// wizard is gone.
    pub fn run_on_navigation_thread(&self, task: impl FnOnce(&mut Wizard) + Send + 'static) -> bool {
        self.tx.send(Box::new(task)).is_ok()
    }
}

/// Completion callback handed to `HostShell::animate_finish`.
pub struct FinishHandle {
    poster: NavigationPoster,
    generation: u64,
}

impl FinishHandle {
    pub(crate) fn new(poster: NavigationPoster, generation: u64) -> Self {
        Self { poster, generation }
    }

    /// Signal that the finish animation has ended.
    pub fn complete(self) {
        let generation = self.generation;
        if !self
            .poster
            .run_on_navigation_thread(move |wizard| wizard.on_finish_animation_done(generation))
        {
            tracing::debug!("Finish animation ended after wizard was dropped");
        }
    }
}
