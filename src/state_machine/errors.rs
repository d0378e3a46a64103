use thiserror::Error;

/// Error types for state machine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Retry limit must be at least 1, got {0}")]
    InvalidRetryLimit(i32),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;

/// Helper function to create invalid transition errors
pub fn invalid_transition(from: impl ToString, event: impl Into<String>) -> StateMachineError {
    StateMachineError::InvalidTransition {
        from: from.to_string(),
        event: event.into(),
    }
}
