//! Provides the task `Scheduler` that defers every pledge dispatch to a later turn.
//!
//! The scheduler keeps a single FIFO queue of zero-argument tasks. Enqueuing never
//! runs anything: when the queue goes from empty to non-empty, the configured
//! [`Backend`] is asked for exactly one deferred drain. A drain pass runs tasks in
//! insertion order until the queue is empty, including tasks enqueued by the tasks
//! it runs.
//!
//! There is one scheduler per thread. Pledges are not `Send`, so every pledge created
//! on a thread is dispatched by that thread's scheduler.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
};

use futures::task::{LocalSpawn, LocalSpawnExt};

type Task = Box<dyn FnOnce()>;

thread_local! {
    static SCHEDULER: Scheduler = Scheduler::new();
}

/// The mechanism used to arrange a deferred drain of the task queue.
///
/// `request_drain` is called at most once per transition of the queue from empty to
/// non-empty. Implementations must arrange for [`run_until_idle`] to be called later
/// on the same thread, and must never call it synchronously from `request_drain`.
///
/// Any `Fn()` closure is a backend, which makes it easy to plug in a host event loop:
///
/// ```no_run
/// pledge::scheduler::set_backend(|| {
///     tokio::task::spawn_local(async {
///         pledge::scheduler::run_until_idle();
///     });
/// });
/// ```
pub trait Backend {
    /// Arranges one deferred call of [`run_until_idle`].
    fn request_drain(&self);
}

impl<F> Backend for F
where
    F: Fn(),
{
    fn request_drain(&self) {
        self()
    }
}

/// The default backend: the host drains the queue at its own checkpoints by calling
/// [`run_until_idle`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Manual;

impl Backend for Manual {
    fn request_drain(&self) {}
}

/// A backend that spawns a drain future onto a local executor, such as
/// [`futures::executor::LocalPool`].
///
/// Each request spawns one future that drains the queue when the executor polls it,
/// which is always a later turn than the enqueuing code.
pub struct Spawner<S> {
    spawner: S,
}

impl<S: LocalSpawn> Spawner<S> {
    /// Wraps a local spawner.
    pub fn new(spawner: S) -> Self {
        Self { spawner }
    }
}

impl<S: LocalSpawn> Backend for Spawner<S> {
    fn request_drain(&self) {
        let spawned = self.spawner.spawn_local(async {
            run_until_idle();
        });
        if let Err(err) = spawned {
            tracing::error!(error = %err, "failed to spawn scheduler drain");
        }
    }
}

// Ends a drain pass even if a task panics. Tasks left behind by a panic get a fresh
// drain request, later enqueues would not ask for one while the queue is non-empty.
struct DrainGuard<'a>(&'a Scheduler);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.draining.set(false);
        let left = self.0.pending_tasks();
        if left > 0 {
            tracing::debug!(left, "drain pass interrupted; requesting another");
            self.0.request_drain();
        }
    }
}

/// A FIFO queue of deferred tasks bound to a scheduling backend.
///
/// Most code goes through the free functions of this module, which operate on the
/// current thread's scheduler. Errors raised by tasks are not handled here; pledge
/// dispatch never lets a callback failure escape its task.
pub struct Scheduler {
    queue: RefCell<VecDeque<Task>>,
    backend: RefCell<Rc<dyn Backend>>,
    draining: Cell<bool>,
}

impl Scheduler {
    /// Creates a scheduler with an empty queue and the [`Manual`] backend.
    #[must_use]
    pub fn new() -> Self {
        Scheduler {
            queue: RefCell::new(VecDeque::with_capacity(16)),
            backend: RefCell::new(Rc::new(Manual)),
            draining: Cell::new(false),
        }
    }

    /// Appends a task to the queue.
    ///
    /// If the queue was empty and no drain pass is running, the backend is asked for
    /// one deferred drain. The task never runs before this call returns.
    pub fn enqueue(&self, task: impl FnOnce() + 'static) {
        let first = {
            let mut queue = self.queue.borrow_mut();
            queue.push_back(Box::new(task));
            queue.len() == 1
        };
        tracing::trace!(first, "task enqueued");
        if first && !self.draining.get() {
            self.request_drain();
        }
    }

    /// Runs queued tasks in FIFO order until the queue is empty and returns how many ran.
    ///
    /// Tasks enqueued while draining run in the same pass. Calling this from inside a
    /// running task does nothing and returns `0`; the outer pass picks the work up.
    pub fn run_until_idle(&self) -> usize {
        if self.draining.replace(true) {
            return 0;
        }
        let _guard = DrainGuard(self);
        let mut ran = 0;
        loop {
            // The borrow must end before the task runs, tasks enqueue more tasks.
            let task = self.queue.borrow_mut().pop_front();
            let Some(task) = task else {
                break;
            };
            task();
            ran += 1;
        }
        if ran > 0 {
            tracing::debug!(ran, "scheduler drain pass finished");
        }
        ran
    }

    /// Returns the number of tasks waiting to run.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Replaces the backend.
    ///
    /// If tasks are already waiting, the new backend is asked for a drain so that
    /// they are not stranded behind the old one.
    pub fn set_backend(&self, backend: impl Backend + 'static) {
        *self.backend.borrow_mut() = Rc::new(backend);
        if self.pending_tasks() > 0 && !self.draining.get() {
            self.request_drain();
        }
    }

    fn request_drain(&self) {
        let backend = Rc::clone(&self.backend.borrow());
        backend.request_drain();
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends a task to the current thread's scheduler. See [`Scheduler::enqueue`].
pub fn enqueue(task: impl FnOnce() + 'static) {
    SCHEDULER.with(|scheduler| scheduler.enqueue(task));
}

/// Drains the current thread's scheduler. See [`Scheduler::run_until_idle`].
pub fn run_until_idle() -> usize {
    SCHEDULER.with(Scheduler::run_until_idle)
}

/// Returns the number of tasks waiting on the current thread's scheduler.
#[must_use]
pub fn pending_tasks() -> usize {
    SCHEDULER.with(Scheduler::pending_tasks)
}

/// Replaces the current thread's backend. See [`Scheduler::set_backend`].
pub fn set_backend(backend: impl Backend + 'static) {
    SCHEDULER.with(|scheduler| scheduler.set_backend(backend));
}
