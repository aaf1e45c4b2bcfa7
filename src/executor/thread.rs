//! Thread-per-job executor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use super::error::SubmitResult;
use super::{BackingExecutor, Job};

/// Spawns a fresh named OS thread for every job.
///
/// Never queues, so a reserved worker loop submitted here parks almost
/// immediately. Spawn failures surface as [`SubmitError::Spawn`](super::SubmitError::Spawn).
pub struct ThreadPerTask {
    name: String,
    spawned: AtomicUsize,
}

impl ThreadPerTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spawned: AtomicUsize::new(0),
        }
    }

    /// Total threads spawned so far.
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }
}

impl BackingExecutor for ThreadPerTask {
    fn submit(&self, job: Job) -> SubmitResult<()> {
        let id = self.spawned.fetch_add(1, Ordering::SeqCst);

        thread::Builder::new()
            .name(format!("{}-{}", self.name, id))
            .spawn(job)?;

        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
