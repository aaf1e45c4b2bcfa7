//! Backing pool configuration.

use std::num::NonZeroUsize;

use super::parse::env_or;
use super::ConfigError;

/// Backing pool configuration loaded from environment.
///
/// All values are pre-computed at construction time.
#[derive(Clone, Debug)]
pub struct BackingConfig {
    /// Resolved thread count (never zero).
    threads: NonZeroUsize,
    /// Resolved queue capacity (never zero).
    queue_capacity: NonZeroUsize,
}

impl BackingConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let threads = Self::parse_threads()?;
        let queue_capacity = Self::parse_queue_capacity(threads)?;

        Ok(Self {
            threads,
            queue_capacity,
        })
    }

    #[inline]
    pub fn threads(&self) -> usize {
        self.threads.get()
    }

    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.get()
    }

    fn parse_threads() -> Result<NonZeroUsize, ConfigError> {
        let raw = env_or("BACKING_THREADS", "0");
        let threads: usize = raw.parse().map_err(|e| ConfigError::Parse {
            key: "BACKING_THREADS".into(),
            value: raw,
            error: format!("{e}"),
        })?;

        // Resolve 0 to CPU count
        let count = if threads == 0 {
            num_cpus::get()
        } else {
            threads
        };

        NonZeroUsize::new(count).ok_or_else(|| ConfigError::Invalid {
            key: "BACKING_THREADS".into(),
            message: "thread count cannot be zero".into(),
        })
    }

    fn parse_queue_capacity(threads: NonZeroUsize) -> Result<NonZeroUsize, ConfigError> {
        let raw = env_or("BACKING_QUEUE_CAPACITY", "0");
        let capacity: usize = raw.parse().map_err(|e| ConfigError::Parse {
            key: "BACKING_QUEUE_CAPACITY".into(),
            value: raw,
            error: format!("{e}"),
        })?;

        // Resolve 0 to threads * 100
        let count = if capacity == 0 {
            threads.get() * 100
        } else {
            capacity
        };

        NonZeroUsize::new(count).ok_or_else(|| ConfigError::Invalid {
            key: "BACKING_QUEUE_CAPACITY".into(),
            message: "queue capacity cannot be zero".into(),
        })
    }
}
