//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Jobwarden
///
/// Infrastructure and service failures are funnelled into this enum. Failures
/// of individual work items are never reported through it; those are
/// [`TaskError`](crate::TaskError) values carried inside batch results.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum JobwardenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task runtime error: {0}")]
    Runtime(String),

    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for JobwardenError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for Jobwarden operations
pub type Result<T> = std::result::Result<T, JobwardenError>;
