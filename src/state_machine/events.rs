use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events that can trigger run state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RunEvent {
    /// The executor picked up or reported on one of the run's steps
    StartProcessing,
    /// The generator signalled that no further steps are needed
    Complete,
    /// Generation failed or a step exhausted its retries
    Fail(String),
}

impl RunEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StartProcessing => "start_processing",
            Self::Complete => "complete",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Events that can trigger step state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StepEvent {
    /// Executor reported success with its translated result payload
    Succeed(Value),
    /// Executor reported failure
    Fail(String),
    /// No report arrived within the staleness window
    TimeOut(String),
}

impl StepEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Succeed(_) => "succeed",
            Self::Fail(_) => "fail",
            Self::TimeOut(_) => "time_out",
        }
    }

    /// Extract error message if this is a failure or timeout event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) | Self::TimeOut(msg) => Some(msg),
            Self::Succeed(_) => None,
        }
    }

    /// Whether this event consumes one unit of the retry budget
    pub fn counts_as_attempt_failure(&self) -> bool {
        matches!(self, Self::Fail(_) | Self::TimeOut(_))
    }
}

impl StepEvent {
    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}
