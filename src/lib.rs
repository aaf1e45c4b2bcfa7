//! reserved_dispatch - zero-queue task handoff to pre-started worker threads.
//!
//! A [`Dispatcher`](reserved::Dispatcher) keeps a small pool of parked
//! worker threads. A task offered to it either starts immediately on one of
//! those threads or is declined, in which case the caller runs it on a
//! general-purpose [`BackingExecutor`](executor::BackingExecutor).
//!
//! # Features
//!
//! - **Lazy workers**: Reserved threads start only when demand shows up
//! - **Exclusive handoff**: A task accepted by `try_execute` runs exactly once
//! - **Idle shrink**: Parked threads retire after a configurable timeout
//! - **Clean shutdown**: `stop` retires every worker and waits for them
//! - **Pluggable backing executors**: Queued pool, thread-per-task, Tokio blocking pool
//! - **Prometheus metrics**: Accounting gauges and cumulative counters
//!
//! # Example
//!
//! ```rust,ignore
//! use reserved_dispatch::executor::QueuedPool;
//! use reserved_dispatch::reserved::{Dispatcher, Route};
//! use std::sync::Arc;
//!
//! let pool = Arc::new(QueuedPool::new(16, "pool")?);
//! let reserved = Dispatcher::new(Arc::clone(&pool), 2);
//! reserved.start()?;
//!
//! match reserved.execute_or_fallback(|| serve_connection())? {
//!     Route::Reserved => {}
//!     Route::Fallback => {}
//! }
//! ```

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod executor;
pub mod logging;
pub mod observability;
pub mod reserved;

// Re-exports for convenience
pub use config::Config;
pub use executor::BackingExecutor;
pub use reserved::{Dispatcher, Route};
