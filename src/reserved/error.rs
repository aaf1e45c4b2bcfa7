//! Dispatcher error types.

use std::fmt;

use super::State;

/// Usage errors raised by lifecycle and configuration operations.
///
/// Runtime conditions never produce a `DispatchError`: a declined
/// `try_execute` is reported as `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The operation is not legal in the dispatcher's current state.
    IllegalState {
        /// Operation that was attempted.
        op: &'static str,
        /// State the dispatcher was in.
        state: State,
    },
}

impl DispatchError {
    /// Check if this is an illegal state error.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, DispatchError::IllegalState { .. })
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::IllegalState { op, state } => {
                write!(f, "cannot {} while {}", op, state)
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Result type alias for dispatcher operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
