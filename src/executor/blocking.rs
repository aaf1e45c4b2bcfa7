//! Tokio blocking-pool adapter.

use tokio::runtime::{Handle, RuntimeFlavor};

use super::error::{SubmitError, SubmitResult};
use super::{BackingExecutor, Job};

/// Runs jobs on a Tokio runtime's blocking thread pool.
///
/// Reserved worker loops block while parked, so they must never run on the
/// async worker threads; `spawn_blocking` keeps them off those.
pub struct TokioBlocking {
    handle: Handle,
    name: String,
}

impl TokioBlocking {
    /// Wrap an explicit runtime handle.
    pub fn new(handle: Handle) -> Self {
        let name = match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => "tokio-current-thread",
            _ => "tokio-blocking",
        };
        Self {
            handle,
            name: name.to_string(),
        }
    }

    /// Wrap the runtime the caller is currently running inside.
    ///
    /// Returns `SubmitError::Shutdown` outside a runtime context.
    pub fn current() -> SubmitResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| SubmitError::Shutdown)
    }
}

impl BackingExecutor for TokioBlocking {
    fn submit(&self, job: Job) -> SubmitResult<()> {
        // Dropping the JoinHandle detaches the job; it still runs.
        let _ = self.handle.spawn_blocking(job);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
