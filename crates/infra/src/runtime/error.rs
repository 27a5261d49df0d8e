//! Runtime error types

use jobwarden_domain::JobwardenError;
use thiserror::Error;

use crate::errors::InfraError;

/// Task runtime lifecycle errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Workers are already running
    #[error("Task runtime already running")]
    AlreadyRunning,

    /// Workers are not running
    #[error("Task runtime not running")]
    NotRunning,

    /// No handler is registered under the submitted task name
    #[error("No handler registered for task '{name}'")]
    UnknownHandler { name: String },

    /// Workers did not stop in time
    #[error("Workers did not stop within {seconds}s")]
    ShutdownTimeout { seconds: u64 },
}

impl From<RuntimeError> for InfraError {
    fn from(err: RuntimeError) -> Self {
        let jobwarden_err = match err {
            RuntimeError::UnknownHandler { .. } => JobwardenError::InvalidInput(err.to_string()),
            RuntimeError::AlreadyRunning | RuntimeError::NotRunning => JobwardenError::Runtime(err.to_string()),
            RuntimeError::ShutdownTimeout { .. } => JobwardenError::Internal(err.to_string()),
        };
        InfraError(jobwarden_err)
    }
}

impl From<RuntimeError> for JobwardenError {
    fn from(err: RuntimeError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for runtime lifecycle operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
