//! Reserved-thread dispatcher.
//!
//! Keeps a small set of idle worker threads parked so a task can start
//! running immediately, without waiting in the backing executor's queue.
//! When no reserved worker is parked the dispatcher declines and the caller
//! routes the task to the backing executor instead.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       Dispatcher                           │
//! ├────────────────────────────────────────────────────────────┤
//! │   try_execute(task)                                        │
//! │        │                                                   │
//! │        ▼                                                   │
//! │   ┌──────────────────────┐   parked?   ┌─────────────────┐ │
//! │   │ Mutex<Inner>         │────yes─────►│ worker slot     │ │
//! │   │  parked / pending /  │             │ (sync_channel 1)│ │
//! │   │  starting / state    │             └─────────────────┘ │
//! │   └──────────┬───────────┘                                 │
//! │              │ no, below capacity                          │
//! │              ▼                                             │
//! │   BackingExecutor::submit(worker loop)  ──► returns false  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Workers are created lazily, one per declined call while below capacity,
//! and retire after sitting parked for the idle timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! use reserved_dispatch::executor::{BackingExecutor, QueuedPool};
//! use reserved_dispatch::reserved::Dispatcher;
//! use std::sync::Arc;
//!
//! let pool = Arc::new(QueuedPool::new(16, "pool")?);
//! let reserved = Dispatcher::new(Arc::clone(&pool), 2);
//! reserved.start()?;
//!
//! if !reserved.try_execute(|| handle_readable()) {
//!     pool.submit(Box::new(|| handle_readable()))?;
//! }
//! ```

mod builder;
mod error;
mod fault;
mod state;
mod worker;

pub use builder::{DispatcherBuilder, DEFAULT_IDLE_TIMEOUT};
pub use error::{DispatchError, DispatchResult};
pub use fault::{FaultSink, LogSink};
pub use state::{DispatcherStats, State};

pub(crate) use fault::panic_message;

use std::sync::mpsc::TrySendError;
use std::sync::Arc;
use std::time::Duration;

use crate::executor::{BackingExecutor, SubmitResult};

use state::{Counters, Inner, Shared};
use worker::{Handoff, Worker};

/// An opaque unit of work run by a reserved worker.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Which path a task took through [`Dispatcher::execute_or_fallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Handed to a parked reserved worker.
    Reserved,
    /// Submitted to the backing executor.
    Fallback,
}

/// Reserved-thread dispatcher.
///
/// All methods may be called concurrently from any thread.
///
/// `stop` waits for running tasks, so it must not be called from inside a
/// task running on one of this dispatcher's workers. Dropping the
/// dispatcher retires its workers without waiting and is safe anywhere.
pub struct Dispatcher {
    shared: Arc<Shared>,
    backing: Arc<dyn BackingExecutor>,
}

impl Dispatcher {
    /// Create a stopped dispatcher with the default idle timeout.
    ///
    /// A capacity of 0 disables reserved execution: every `try_execute`
    /// declines.
    pub fn new<E>(backing: E, capacity: usize) -> Self
    where
        E: BackingExecutor + 'static,
    {
        DispatcherBuilder::new().capacity(capacity).build(backing)
    }

    /// Start configuring a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub(crate) fn from_parts(shared: Shared, backing: Arc<dyn BackingExecutor>) -> Self {
        Self {
            shared: Arc::new(shared),
            backing,
        }
    }

    /// Move from stopped to running. No workers are created here.
    pub fn start(&self) -> DispatchResult<()> {
        let mut inner = self.shared.lock();
        if inner.state != State::Stopped {
            return Err(DispatchError::IllegalState {
                op: "start",
                state: inner.state,
            });
        }

        // Starting is transitional and never seen outside this lock.
        inner.state = State::Starting;
        inner.state = State::Running;

        tracing::info!(
            dispatcher = %self.shared.name,
            capacity = self.shared.capacity,
            idle_timeout_ms = inner.idle_timeout.map(|t| t.as_millis() as u64),
            backing = %self.backing.name(),
            "reserved dispatcher started"
        );
        Ok(())
    }

    /// Retire every worker and wait for them to exit.
    ///
    /// Parked workers retire at once; busy workers finish their current task
    /// first. Calls made while already stopped return immediately, and a
    /// call racing another stop waits for it to complete.
    pub fn stop(&self) {
        let mut inner = self.shared.lock();
        match inner.state {
            State::Stopped => return,
            State::Stopping => {
                let _done = self.shared.wait_until(inner, |i| i.state == State::Stopped);
                return;
            }
            State::Starting | State::Running => {}
        }

        self.begin_stop(&mut inner);

        let mut inner = self.shared.wait_until(inner, |i| i.live == 0);
        inner.state = State::Stopped;
        drop(inner);
        self.shared.notify_exit();

        tracing::info!(dispatcher = %self.shared.name, "reserved dispatcher stopped");
    }

    /// Move to Stopping and retire every parked worker. Busy workers retire
    /// when their task ends. Does not wait.
    fn begin_stop(&self, inner: &mut Inner) {
        inner.state = State::Stopping;
        inner.epoch += 1;
        // Loops still queued in the backing executor exit on their own.
        inner.starting = 0;

        let parked = inner.parked.len();
        for worker in inner.parked.drain(..) {
            let _ = worker.slot.try_send(Handoff::Retire);
        }

        tracing::info!(
            dispatcher = %self.shared.name,
            parked,
            busy = inner.pending,
            "stopping reserved dispatcher"
        );
    }

    /// Try to run `task` on a parked reserved worker.
    ///
    /// Returns `true` once a specific worker owns the task; it will run
    /// exactly once. Returns `false` if no worker is parked or the
    /// dispatcher is not running, in which case the caller must run the task
    /// some other way. Never blocks.
    pub fn try_execute<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.offer(Box::new(task)).is_ok()
    }

    /// Like [`try_execute`](Self::try_execute) but hands a declined task
    /// back to the caller.
    pub fn offer(&self, task: Task) -> Result<(), Task> {
        let mut inner = self.shared.lock();
        if inner.state != State::Running {
            Counters::incr(&self.shared.counters.declined);
            return Err(task);
        }

        let mut task = task;
        while let Some(worker) = inner.parked.pop() {
            match worker.slot.try_send(Handoff::Task(task)) {
                Ok(()) => {
                    inner.pending += 1;
                    Counters::incr(&self.shared.counters.accepted);
                    return Ok(());
                }
                Err(TrySendError::Full(handoff)) => {
                    // A parked slot is always empty; keep the worker and
                    // decline rather than guess.
                    tracing::error!(
                        dispatcher = %self.shared.name,
                        worker = worker.id,
                        "parked worker slot occupied"
                    );
                    inner.parked.push(worker);
                    Counters::incr(&self.shared.counters.declined);
                    return Err(handoff.into_task());
                }
                Err(TrySendError::Disconnected(handoff)) => {
                    // A worker holds its own sender and leaves `parked`
                    // before exiting, so its slot cannot close while parked.
                    tracing::error!(
                        dispatcher = %self.shared.name,
                        worker = worker.id,
                        "parked worker vanished"
                    );
                    task = handoff.into_task();
                }
            }
        }

        if inner.reserved() < self.shared.capacity {
            inner.starting += 1;
            let id = inner.next_worker_id();
            let epoch = inner.epoch;
            drop(inner);
            self.spawn_worker(Worker::new(id, epoch, Arc::clone(&self.shared)));
        }

        Counters::incr(&self.shared.counters.declined);
        Err(task)
    }

    /// Run `task` on a reserved worker if one is parked, otherwise submit it
    /// to the backing executor.
    pub fn execute_or_fallback<F>(&self, task: F) -> SubmitResult<Route>
    where
        F: FnOnce() + Send + 'static,
    {
        match self.offer(Box::new(task)) {
            Ok(()) => Ok(Route::Reserved),
            Err(task) => self.backing.submit(task).map(|()| Route::Fallback),
        }
    }

    /// Submit a worker loop. Called without the lock held: an executor may
    /// run the job inline.
    fn spawn_worker(&self, worker: Worker) {
        let id = worker.id();
        match self.backing.submit(Box::new(move || worker.run())) {
            Ok(()) => {
                Counters::incr(&self.shared.counters.spawned);
                tracing::debug!(
                    dispatcher = %self.shared.name,
                    worker = id,
                    "reserved worker submitted"
                );
            }
            Err(e) => {
                // The dropped job already released its start slot.
                Counters::incr(&self.shared.counters.spawn_failures);
                tracing::warn!(
                    dispatcher = %self.shared.name,
                    worker = id,
                    error = %e,
                    "failed to start reserved worker"
                );
            }
        }
    }

    /// Change how long a parked worker waits before retiring. `None`
    /// disables retirement.
    ///
    /// Only legal while stopped; takes effect for workers created after the
    /// next start.
    pub fn set_idle_timeout(&self, timeout: Option<Duration>) -> DispatchResult<()> {
        let mut inner = self.shared.lock();
        if inner.state != State::Stopped {
            return Err(DispatchError::IllegalState {
                op: "set idle timeout",
                state: inner.state,
            });
        }
        inner.idle_timeout = timeout.filter(|t| !t.is_zero());
        Ok(())
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.shared.lock().idle_timeout
    }

    /// Workers parked and ready to take a task.
    pub fn available(&self) -> usize {
        self.shared.lock().available()
    }

    /// Workers currently executing a task.
    pub fn pending(&self) -> usize {
        self.shared.lock().pending
    }

    /// Worker loops submitted to the backing executor that have not parked
    /// yet.
    pub fn starting(&self) -> usize {
        self.shared.lock().starting
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn state(&self) -> State {
        self.shared.lock().state
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn stats(&self) -> DispatcherStats {
        self.shared.stats()
    }
}

impl Drop for Dispatcher {
    /// The last handle may be dropped by a task running on one of this
    /// dispatcher's workers, so drop never waits for workers to exit.
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if matches!(inner.state, State::Stopped | State::Stopping) {
            return;
        }
        self.begin_stop(&mut inner);
        if inner.live == 0 {
            inner.state = State::Stopped;
        }
    }
}
