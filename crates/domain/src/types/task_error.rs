//! Typed failure taxonomy for work items
//!
//! Every failure that crosses the resilient call boundary is converted into a
//! [`TaskError`]. The [`TaskErrorCode`] decides up front whether the failure
//! can ever be retried; the remaining retry budget is tracked on the error
//! itself so callers can pass it along by value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::DEFAULT_MAX_RETRIES;
use crate::impl_status_conversions;

/// Closed set of failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskErrorCode {
    // Storage / connectivity
    StorageConnectionError,
    StorageQueryError,

    // Domain
    EntityNotFound,
    ValidationError,

    // External dependency
    DependencyUnavailable,
    DependencyTimeout,
    DependencyRateLimited,
    DependencyInvalidResponse,

    // Configuration
    ConfigurationInvalid,
    ConfigurationMissing,

    // Resources
    ResourceExhausted,
    ResourceTimeout,

    // Generic
    UnknownError,
    PermissionDenied,

    /// The item was cancelled before it produced an outcome
    TaskCancelled,
}

impl_status_conversions!(TaskErrorCode {
    StorageConnectionError => "STORAGE_CONNECTION_ERROR",
    StorageQueryError => "STORAGE_QUERY_ERROR",
    EntityNotFound => "ENTITY_NOT_FOUND",
    ValidationError => "VALIDATION_ERROR",
    DependencyUnavailable => "DEPENDENCY_UNAVAILABLE",
    DependencyTimeout => "DEPENDENCY_TIMEOUT",
    DependencyRateLimited => "DEPENDENCY_RATE_LIMITED",
    DependencyInvalidResponse => "DEPENDENCY_INVALID_RESPONSE",
    ConfigurationInvalid => "CONFIGURATION_INVALID",
    ConfigurationMissing => "CONFIGURATION_MISSING",
    ResourceExhausted => "RESOURCE_EXHAUSTED",
    ResourceTimeout => "RESOURCE_TIMEOUT",
    UnknownError => "UNKNOWN_ERROR",
    PermissionDenied => "PERMISSION_DENIED",
    TaskCancelled => "TASK_CANCELLED",
});

impl TaskErrorCode {
    /// Codes that are never retried, whatever budget remains
    pub const NON_RETRYABLE: [Self; 5] = [
        Self::EntityNotFound,
        Self::ConfigurationInvalid,
        Self::PermissionDenied,
        Self::ValidationError,
        Self::TaskCancelled,
    ];

    /// Whether failures with this code may be retried at all
    pub fn is_retryable(self) -> bool {
        !Self::NON_RETRYABLE.contains(&self)
    }
}

/// A classified failure of a single unit of work
///
/// `retryable` is derived from `code` when the error is constructed and never
/// changes. Only the retry bookkeeping (`retry_count`) moves afterwards.
/// Deserialization ignores any incoming `retryable` flag for the same reason.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(from = "TaskErrorRepr")]
#[error("[{code}] {message}")]
pub struct TaskError {
    code: TaskErrorCode,
    message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    details: BTreeMap<String, Value>,
    retry_count: u32,
    max_retries: u32,
    retryable: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    context: BTreeMap<String, Value>,
}

/// Wire form of [`TaskError`] without the derived `retryable` flag
#[derive(Deserialize)]
struct TaskErrorRepr {
    code: TaskErrorCode,
    message: String,
    #[serde(default)]
    details: BTreeMap<String, Value>,
    retry_count: u32,
    max_retries: u32,
    #[serde(default)]
    context: BTreeMap<String, Value>,
}

impl From<TaskErrorRepr> for TaskError {
    fn from(repr: TaskErrorRepr) -> Self {
        Self {
            code: repr.code,
            message: repr.message,
            details: repr.details,
            retry_count: repr.retry_count,
            max_retries: repr.max_retries,
            retryable: repr.code.is_retryable(),
            context: repr.context,
        }
    }
}

impl TaskError {
    /// Create a new error; retry eligibility follows from `code`
    pub fn new(code: TaskErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: BTreeMap::new(),
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            retryable: code.is_retryable(),
            context: BTreeMap::new(),
        }
    }

    /// Entity lookup failed
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::new(TaskErrorCode::EntityNotFound, format!("{entity} {id} not found"))
            .with_detail("entity", entity)
            .with_detail("id", id.to_string())
    }

    /// Input failed validation
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(TaskErrorCode::ValidationError, message)
    }

    /// Item was cancelled before completing
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(TaskErrorCode::TaskCancelled, message)
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Merge a whole context map; existing keys are overwritten
    pub fn with_context_map(mut self, context: &BTreeMap<String, Value>) -> Self {
        self.context.extend(context.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Record one more retry attempt
    pub fn increment_retry(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }

    pub fn code(&self) -> TaskErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &BTreeMap<String, Value> {
        &self.details
    }

    pub fn context(&self) -> &BTreeMap<String, Value> {
        &self.context
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}
