//! Dispatcher state shared with workers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use super::fault::FaultSink;
use super::worker::Handoff;

/// Dispatcher lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Stopped => "stopped",
            State::Starting => "starting",
            State::Running => "running",
            State::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// A worker waiting for a handoff.
pub(crate) struct Parked {
    pub id: usize,
    pub slot: SyncSender<Handoff>,
}

/// Everything guarded by the dispatcher lock.
///
/// `parked.len()` is the available count. A worker is in exactly one of:
/// `parked`, counted by `pending`, or retiring (counted only by `live`).
pub(crate) struct Inner {
    pub state: State,
    /// Parked workers, most recently parked last.
    pub parked: Vec<Parked>,
    /// Workers executing a task.
    pub pending: usize,
    /// Worker loops submitted to the backing executor but not yet parked.
    pub starting: usize,
    /// Worker loops that registered and have not exited.
    pub live: usize,
    pub idle_timeout: Option<Duration>,
    /// Bumped by every stop; stale worker loops compare against it.
    pub epoch: u64,
    next_worker_id: usize,
}

impl Inner {
    pub fn available(&self) -> usize {
        self.parked.len()
    }

    /// Workers counted against capacity.
    pub fn reserved(&self) -> usize {
        self.parked.len() + self.pending + self.starting
    }

    pub fn next_worker_id(&mut self) -> usize {
        let id = self.next_worker_id;
        self.next_worker_id += 1;
        id
    }

    /// Remove a parked worker by id. Returns false if it was already claimed.
    pub fn unpark(&mut self, id: usize) -> bool {
        match self.parked.iter().position(|p| p.id == id) {
            Some(idx) => {
                self.parked.remove(idx);
                true
            }
            None => false,
        }
    }

    /// True if a worker created in `epoch` may keep serving.
    pub fn accepts(&self, epoch: u64) -> bool {
        self.state == State::Running && self.epoch == epoch
    }
}

/// Cumulative counters, readable without the lock.
#[derive(Default)]
pub(crate) struct Counters {
    pub accepted: AtomicU64,
    pub declined: AtomicU64,
    pub spawned: AtomicU64,
    pub spawn_failures: AtomicU64,
    pub idle_retired: AtomicU64,
    pub task_failures: AtomicU64,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// State shared between a dispatcher and the workers it created.
pub(crate) struct Shared {
    pub name: String,
    pub capacity: usize,
    pub fault_sink: Arc<dyn FaultSink>,
    pub counters: Counters,
    inner: Mutex<Inner>,
    /// Signalled whenever a worker exits or a stop completes.
    exited: Condvar,
}

impl Shared {
    pub fn new(
        name: String,
        capacity: usize,
        idle_timeout: Option<Duration>,
        fault_sink: Arc<dyn FaultSink>,
    ) -> Self {
        Self {
            name,
            capacity,
            fault_sink,
            counters: Counters::default(),
            inner: Mutex::new(Inner {
                state: State::Stopped,
                parked: Vec::with_capacity(capacity),
                pending: 0,
                starting: 0,
                live: 0,
                idle_timeout,
                epoch: 0,
                next_worker_id: 0,
            }),
            exited: Condvar::new(),
        }
    }

    /// Lock the accounting state. Tasks never run under this lock, so a
    /// poisoned guard still holds consistent counters.
    pub fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until `done` holds, releasing the lock while waiting.
    pub fn wait_until<'a, F>(&self, mut guard: MutexGuard<'a, Inner>, mut done: F) -> MutexGuard<'a, Inner>
    where
        F: FnMut(&Inner) -> bool,
    {
        while !done(&guard) {
            guard = self
                .exited
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        guard
    }

    pub fn notify_exit(&self) {
        self.exited.notify_all();
    }

    pub fn stats(&self) -> DispatcherStats {
        let inner = self.lock();
        let c = &self.counters;
        DispatcherStats {
            state: inner.state,
            capacity: self.capacity,
            available: inner.available(),
            pending: inner.pending,
            starting: inner.starting,
            accepted: c.accepted.load(Ordering::Relaxed),
            declined: c.declined.load(Ordering::Relaxed),
            spawned: c.spawned.load(Ordering::Relaxed),
            spawn_failures: c.spawn_failures.load(Ordering::Relaxed),
            idle_retired: c.idle_retired.load(Ordering::Relaxed),
            task_failures: c.task_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub state: State,
    pub capacity: usize,
    /// Workers parked and ready.
    pub available: usize,
    /// Workers executing a task.
    pub pending: usize,
    /// Worker loops submitted but not yet parked.
    pub starting: usize,
    /// Tasks handed to a reserved worker.
    pub accepted: u64,
    /// Tasks declined back to the caller.
    pub declined: u64,
    /// Worker loops submitted to the backing executor.
    pub spawned: u64,
    /// Worker loops the backing executor refused.
    pub spawn_failures: u64,
    /// Workers retired by the idle timeout.
    pub idle_retired: u64,
    /// Tasks that panicked.
    pub task_failures: u64,
}
