//! Reserved worker loop.
//!
//! ```text
//! Created ──► Parked ──task──► Executing ──► Parked ...
//!               │                  │
//!        idle / retire      dispatcher stopping
//!               ▼                  ▼
//!            Retired            Retired
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use super::fault::panic_message;
use super::state::{Counters, Parked, Shared};
use super::Task;

/// What a parked worker can receive in its slot.
pub(crate) enum Handoff {
    Task(Task),
    Retire,
}

impl Handoff {
    /// Recover a task from a handoff that failed to send. Only the
    /// dispatcher's `offer` sends tasks, and it only calls this on its own.
    pub fn into_task(self) -> Task {
        match self {
            Handoff::Task(task) => task,
            Handoff::Retire => unreachable!("offer only sends tasks"),
        }
    }
}

/// A reserved worker, created by the dispatcher and run by the backing
/// executor.
pub(crate) struct Worker {
    id: usize,
    /// Dispatcher epoch this worker was created in.
    epoch: u64,
    shared: Arc<Shared>,
    launched: bool,
}

impl Worker {
    /// The caller must already have counted this worker in `starting`.
    pub fn new(id: usize, epoch: u64, shared: Arc<Shared>) -> Self {
        Self {
            id,
            epoch,
            shared,
            launched: false,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Worker main loop. Returns once the worker has retired.
    pub fn run(mut self) {
        self.launched = true;

        let (slot_tx, slot) = mpsc::sync_channel::<Handoff>(1);

        let idle_timeout = {
            let mut inner = self.shared.lock();
            if inner.epoch != self.epoch {
                // stop() already dropped this loop from `starting`
                tracing::debug!(
                    dispatcher = %self.shared.name,
                    worker = self.id,
                    "stale worker exiting"
                );
                return;
            }
            inner.starting = inner.starting.saturating_sub(1);
            if !inner.accepts(self.epoch) {
                return;
            }
            inner.live += 1;
            inner.parked.push(Parked {
                id: self.id,
                slot: slot_tx.clone(),
            });
            inner.idle_timeout
        };

        tracing::debug!(
            dispatcher = %self.shared.name,
            worker = self.id,
            "worker parked"
        );

        loop {
            let handoff = match self.wait(&slot, idle_timeout) {
                Some(handoff) => handoff,
                None => return,
            };

            match handoff {
                Handoff::Task(task) => {
                    self.execute(task);

                    let mut inner = self.shared.lock();
                    inner.pending = inner.pending.saturating_sub(1);
                    if inner.accepts(self.epoch) {
                        inner.parked.push(Parked {
                            id: self.id,
                            slot: slot_tx.clone(),
                        });
                        continue;
                    }
                    inner.live -= 1;
                    drop(inner);
                    self.shared.notify_exit();

                    tracing::debug!(
                        dispatcher = %self.shared.name,
                        worker = self.id,
                        "worker retired after task"
                    );
                    return;
                }
                Handoff::Retire => {
                    self.shared.lock().live -= 1;
                    self.shared.notify_exit();

                    tracing::debug!(
                        dispatcher = %self.shared.name,
                        worker = self.id,
                        "worker retired"
                    );
                    return;
                }
            }
        }
    }

    /// Wait in the parked state. `None` means the worker retired on idle
    /// timeout and has already deregistered.
    fn wait(&self, slot: &Receiver<Handoff>, idle_timeout: Option<Duration>) -> Option<Handoff> {
        // The loop holds a sender, so the slot never disconnects.
        let timeout = match idle_timeout {
            Some(timeout) => timeout,
            None => return Some(slot.recv().unwrap_or(Handoff::Retire)),
        };

        match slot.recv_timeout(timeout) {
            Ok(handoff) => Some(handoff),
            Err(RecvTimeoutError::Timeout) => {
                let mut inner = self.shared.lock();
                if inner.unpark(self.id) {
                    inner.live -= 1;
                    drop(inner);
                    self.shared.notify_exit();
                    Counters::incr(&self.shared.counters.idle_retired);

                    tracing::debug!(
                        dispatcher = %self.shared.name,
                        worker = self.id,
                        idle_ms = timeout.as_millis() as u64,
                        "idle worker retired"
                    );
                    return None;
                }
                drop(inner);

                // Claimed between the timeout and the lock. The claimer sent
                // under the lock, so the handoff is already in the slot and
                // the worker serves it instead of retiring.
                tracing::debug!(
                    dispatcher = %self.shared.name,
                    worker = self.id,
                    "idle retirement cancelled by handoff"
                );
                Some(slot.recv().unwrap_or(Handoff::Retire))
            }
            Err(RecvTimeoutError::Disconnected) => Some(Handoff::Retire),
        }
    }

    fn execute(&self, task: Task) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            let message = panic_message(payload.as_ref());
            Counters::incr(&self.shared.counters.task_failures);
            self.shared.fault_sink.task_failed(self.id, &message);
        }
    }
}

impl Drop for Worker {
    /// A worker dropped before it ever ran (refused or discarded by the
    /// backing executor) gives its start slot back.
    fn drop(&mut self) {
        if self.launched {
            return;
        }
        let mut inner = self.shared.lock();
        if inner.epoch == self.epoch {
            inner.starting = inner.starting.saturating_sub(1);
        }
    }
}
