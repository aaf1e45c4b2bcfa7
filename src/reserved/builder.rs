//! Dispatcher builder.
//!
//! # Example
//!
//! ```ignore
//! use reserved_dispatch::reserved::Dispatcher;
//!
//! let reserved = Dispatcher::builder()
//!     .capacity(4)
//!     .name("io-reserved")
//!     .idle_timeout(Some(Duration::from_secs(30)))
//!     .build(pool);
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::ReservedConfig;
use crate::executor::BackingExecutor;

use super::fault::{FaultSink, LogSink};
use super::state::Shared;
use super::Dispatcher;

/// Idle timeout used unless configured otherwise.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    capacity: usize,
    name: String,
    idle_timeout: Option<Duration>,
    fault_sink: Arc<dyn FaultSink>,
}

impl DispatcherBuilder {
    /// Create a builder with capacity 1 and default settings.
    pub fn new() -> Self {
        Self {
            capacity: 1,
            name: "reserved".to_string(),
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            fault_sink: Arc::new(LogSink),
        }
    }

    /// Seed capacity and idle timeout from loaded configuration.
    pub fn from_config(config: &ReservedConfig) -> Self {
        Self::new()
            .capacity(config.capacity())
            .idle_timeout(config.idle_timeout)
    }

    /// Maximum number of reserved workers. 0 disables reserved execution.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// How long a parked worker waits before retiring.
    /// `None` or zero = never retire.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// Where panics from tasks are reported.
    pub fn fault_sink(mut self, sink: Arc<dyn FaultSink>) -> Self {
        self.fault_sink = sink;
        self
    }

    /// Build a stopped dispatcher on top of `backing`.
    pub fn build<E>(self, backing: E) -> Dispatcher
    where
        E: BackingExecutor + 'static,
    {
        let shared = Shared::new(self.name, self.capacity, self.idle_timeout, self.fault_sink);
        Dispatcher::from_parts(shared, Arc::new(backing))
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
