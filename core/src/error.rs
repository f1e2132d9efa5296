use crate::types::ApplicationId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Validation failed on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Capability '{capability}' unavailable: {reason}")]
    ExternalUnavailable { capability: String, reason: String },

    #[error("Decision already recorded for application {0}")]
    Duplicate(ApplicationId),

    #[error("Application not found: {0}")]
    ApplicationNotFound(ApplicationId),

    #[error("No decision recorded for application {0}")]
    DecisionNotFound(ApplicationId),

    #[error("Rule set must contain at least one rule")]
    EmptyRuleSet,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DeskResult<T> = Result<T, DeskError>;

impl DeskError {
    /// Shorthand for field-level validation failures.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        DeskError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DeskError::Validation { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, DeskError::Duplicate(_))
    }
}
