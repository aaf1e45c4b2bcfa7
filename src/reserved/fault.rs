//! Where task failures go.

use std::any::Any;

/// Receives failures of tasks run by reserved workers.
///
/// The submitter of a task has already returned by the time it runs, so
/// failures can only be reported out of band.
pub trait FaultSink: Send + Sync {
    /// Called on the worker thread after a task panicked.
    fn task_failed(&self, worker: usize, message: &str);
}

/// Default sink: logs the failure at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl FaultSink for LogSink {
    fn task_failed(&self, worker: usize, message: &str) {
        tracing::error!(worker, error = %message, "reserved task panicked");
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
