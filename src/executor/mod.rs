//! Backing executors.
//!
//! A backing executor is the general-purpose, possibly slow, job runner a
//! [`Dispatcher`](crate::reserved::Dispatcher) uses for two things: physically
//! starting reserved worker loops, and running tasks the reserved path
//! declined.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     BackingExecutor                       │
//! ├───────────────────────────────────────────────────────────┤
//! │   QueuedPool        ThreadPerTask        TokioBlocking    │
//! │   ┌────────┐        ┌────────────┐       ┌─────────────┐  │
//! │   │ sync   │        │ thread     │       │ Handle::    │  │
//! │   │ channel│        │ ::Builder  │       │ spawn_      │  │
//! │   │ + N    │        │ per job    │       │ blocking    │  │
//! │   │ threads│        └────────────┘       └─────────────┘  │
//! │   └────────┘                                              │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! No latency guarantee is assumed from `submit`: a job may sit in a queue
//! indefinitely under load.

mod blocking;
mod error;
mod pool;
mod thread;

pub use blocking::TokioBlocking;
pub use error::{SubmitError, SubmitResult};
pub use pool::QueuedPool;
pub use thread::ThreadPerTask;

use std::sync::Arc;

/// A unit of work accepted by a backing executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Capability to run a job on some thread of the executor's choosing.
///
/// Implementations must be thread-safe. `submit` must eventually run the job
/// if it returns `Ok`, but may queue it for as long as it likes.
pub trait BackingExecutor: Send + Sync {
    /// Hand a job to the executor.
    fn submit(&self, job: Job) -> SubmitResult<()>;

    /// Executor name for logging.
    fn name(&self) -> &str {
        "backing"
    }
}

impl<E: BackingExecutor + ?Sized> BackingExecutor for Arc<E> {
    fn submit(&self, job: Job) -> SubmitResult<()> {
        (**self).submit(job)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
