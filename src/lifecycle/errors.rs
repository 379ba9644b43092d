//! # Lifecycle Errors

use thiserror::Error;
use uuid::Uuid;

use crate::advisor::AdvisorError;

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Errors of the index lifecycle
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("Not allowed to manage indexes of organization {0}")]
    Unauthorized(Uuid),

    #[error("Scenario iteration not found: {0}")]
    IterationNotFound(Uuid),

    #[error(transparent)]
    InvalidAst(#[from] AdvisorError),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Job queue error: {0}")]
    Queue(String),

    #[error("Invalid job payload: {0}")]
    Payload(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LifecycleError {
    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LifecycleError::Catalog(_) | LifecycleError::Queue(_))
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            LifecycleError::Unauthorized(_) => 403,
            LifecycleError::IterationNotFound(_) => 404,
            LifecycleError::InvalidAst(_) => 422,
            LifecycleError::Config(_) => 400,
            LifecycleError::Catalog(_) | LifecycleError::Queue(_) | LifecycleError::Payload(_) => {
                500
            }
        }
    }
}

impl From<serde_json::Error> for LifecycleError {
    fn from(e: serde_json::Error) -> Self {
        LifecycleError::Payload(e.to_string())
    }
}
