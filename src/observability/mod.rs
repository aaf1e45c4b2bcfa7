//! Observability module.
//!
//! Structured logging lives in [`crate::logging`]; this module exports
//! dispatcher state as Prometheus metrics.
//!
//! # Usage
//!
//! ```rust,ignore
//! use reserved_dispatch::observability::Metrics;
//!
//! let metrics = Metrics::new()?;
//! metrics.observe(&dispatcher.stats(), dispatcher.name());
//! println!("{}", metrics.export()?);
//! ```

pub mod metrics;

// Re-exports
pub use metrics::Metrics;
