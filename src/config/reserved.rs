//! Reserved dispatcher configuration.

use std::time::Duration;

use super::parse::{env_duration, env_or};
use super::ConfigError;

/// Requested reserved-thread count before resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReservedThreads {
    /// Derive from CPU count and backing pool size.
    #[default]
    Auto,
    /// Exactly this many (0 disables reserved execution).
    Fixed(usize),
}

impl ReservedThreads {
    /// Parse "auto", a negative number (= auto), or a count.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim().to_lowercase();
        if raw == "auto" || raw.is_empty() {
            return Ok(Self::Auto);
        }
        let n: i64 = raw.parse().map_err(|e| format!("{e}"))?;
        Ok(if n < 0 {
            Self::Auto
        } else {
            Self::Fixed(n as usize)
        })
    }

    /// Resolve to a concrete capacity.
    ///
    /// Auto uses the CPU count, capped at a tenth of the backing pool when
    /// its size is known, at least 1, and always leaving one backing thread
    /// free for fallback work.
    pub fn resolve(self, cpus: usize, backing_threads: Option<usize>) -> usize {
        match self {
            Self::Fixed(n) => n,
            Self::Auto => match backing_threads {
                Some(max) => cpus.min(max / 10).max(1).min(max.saturating_sub(1)),
                None => cpus.max(1),
            },
        }
    }
}

/// Reserved dispatcher configuration loaded from environment.
///
/// Capacity is resolved at construction time.
#[derive(Clone, Debug)]
pub struct ReservedConfig {
    /// Requested thread count as configured.
    pub threads: ReservedThreads,
    /// Parked worker idle timeout (None = never retire).
    pub idle_timeout: Option<Duration>,
    capacity: usize,
}

impl ReservedConfig {
    pub fn new(capacity: usize, idle_timeout: Option<Duration>) -> Self {
        Self {
            threads: ReservedThreads::Fixed(capacity),
            idle_timeout,
            capacity,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `backing_threads` is the resolved backing pool size, used to bound
    /// an automatic capacity.
    pub fn from_env(backing_threads: usize) -> Result<Self, ConfigError> {
        let raw = env_or("RESERVED_THREADS", "auto");
        let threads = ReservedThreads::parse(&raw).map_err(|error| ConfigError::Parse {
            key: "RESERVED_THREADS".into(),
            value: raw,
            error,
        })?;

        let capacity = threads.resolve(num_cpus::get(), Some(backing_threads));
        // Parked workers occupy backing threads; fallback work needs one.
        if capacity > 0 && capacity >= backing_threads {
            return Err(ConfigError::Invalid {
                key: "RESERVED_THREADS".into(),
                message: format!(
                    "{} reserved threads leave none of the {} backing threads for fallback work",
                    capacity, backing_threads
                ),
            });
        }

        Ok(Self {
            threads,
            idle_timeout: env_duration("RESERVED_IDLE_TIMEOUT", "60s")?,
            capacity,
        })
    }

    /// Resolved capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
