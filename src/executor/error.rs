//! Backing executor error types.

use std::fmt;

/// Errors a backing executor can report when it refuses a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The job queue is full.
    QueueFull {
        /// Maximum queue capacity.
        capacity: usize,
    },

    /// The executor has been shut down.
    Shutdown,

    /// A thread could not be spawned for the job.
    Spawn(String),
}

impl SubmitError {
    /// Check if this is a queue full error.
    pub fn is_queue_full(&self) -> bool {
        matches!(self, SubmitError::QueueFull { .. })
    }

    /// Check if this is a shutdown error.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, SubmitError::Shutdown)
    }

    /// Get the error message for logging.
    pub fn message(&self) -> &str {
        match self {
            SubmitError::QueueFull { .. } => "Queue full",
            SubmitError::Shutdown => "Executor shutdown",
            SubmitError::Spawn(msg) => msg,
        }
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::QueueFull { capacity } => {
                write!(f, "queue full: {} jobs already queued", capacity)
            }
            SubmitError::Shutdown => {
                write!(f, "executor has been shut down")
            }
            SubmitError::Spawn(msg) => {
                write!(f, "failed to spawn thread: {}", msg)
            }
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<std::io::Error> for SubmitError {
    fn from(err: std::io::Error) -> Self {
        SubmitError::Spawn(err.to_string())
    }
}

/// Result type alias for submissions.
pub type SubmitResult<T> = Result<T, SubmitError>;
