//! Error types for the publication orchestrator.
//!

use crate::config::ConfigurationError;
use crate::orchestration::step_generator::GenerationError;
use crate::state_machine::StateMachineError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Step generation error: {0}")]
    GenerationError(String),
    #[error("State transition error: {0}")]
    StateTransitionError(String),
    /// The persisted record no longer matches what the transition was computed from.
    #[error("Concurrent modification of {entity} {id}")]
    ConcurrentModification { entity: &'static str, id: Uuid },
    #[error("Run {run_id} already has an outstanding step")]
    SingleFlightViolation { run_id: Uuid },
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn run_not_found(run_id: Uuid) -> Self {
        Self::NotFound {
            entity: "Run",
            id: run_id.to_string(),
        }
    }

    pub fn step_not_found(step_id: Uuid) -> Self {
        Self::NotFound {
            entity: "Step",
            id: step_id.to_string(),
        }
    }

    pub fn product_not_found(tenant_id: &str, subject_id: &str) -> Self {
        Self::NotFound {
            entity: "Product",
            id: format!("{tenant_id}/{subject_id}"),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// Errors caused by the caller rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::ValidationError(_))
    }

    /// Errors signalling that another writer got to the record first.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification { .. } | Self::SingleFlightViolation { .. }
        )
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(error: serde_json::Error) -> Self {
        OrchestratorError::SerializationError(format!("JSON serialization error: {error}"))
    }
}

impl From<sqlx::Error> for OrchestratorError {
    fn from(err: sqlx::Error) -> Self {
        OrchestratorError::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for OrchestratorError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        OrchestratorError::DatabaseError(format!("Migration failed: {err}"))
    }
}

impl From<StateMachineError> for OrchestratorError {
    fn from(err: StateMachineError) -> Self {
        OrchestratorError::StateTransitionError(err.to_string())
    }
}

impl From<GenerationError> for OrchestratorError {
    fn from(err: GenerationError) -> Self {
        OrchestratorError::GenerationError(err.to_string())
    }
}

impl From<ConfigurationError> for OrchestratorError {
    fn from(err: ConfigurationError) -> Self {
        OrchestratorError::ConfigurationError(err.to_string())
    }
}

pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;
