//! Configuration Error Types

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A source could not be read or parsed
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    /// Configuration values did not match the expected shape
    #[error("Failed to deserialize configuration: {0}")]
    DeserializationError(String),

    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },
}

impl ConfigurationError {
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl ToString,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            context: context.into(),
        }
    }

    pub fn missing_required_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }
}

impl From<::config::ConfigError> for ConfigurationError {
    fn from(err: ::config::ConfigError) -> Self {
        match err {
            ::config::ConfigError::Type { .. } | ::config::ConfigError::Message(_) => {
                Self::DeserializationError(err.to_string())
            }
            other => Self::LoadError(other.to_string()),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
