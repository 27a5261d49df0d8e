//! Conversions from external infrastructure errors into domain errors.
//!
//! HTTP failures are also rendered as messages the error classifier
//! recognizes, so a job that calls out over HTTP gets a meaningful
//! [`TaskErrorCode`](jobwarden_domain::TaskErrorCode) without knowing about
//! the rule table.

use jobwarden_domain::JobwardenError;
use reqwest::{Error as HttpError, StatusCode};
use thiserror::Error;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(pub JobwardenError);

impl From<InfraError> for JobwardenError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<JobwardenError> for InfraError {
    fn from(value: JobwardenError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → JobwardenError */
/* -------------------------------------------------------------------------- */

/// Classifier-friendly description of an HTTP status failure
pub fn describe_http_status(status: StatusCode) -> String {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("unknown status");
    match code {
        401 | 403 => format!("permission denied by endpoint: HTTP {code} {reason}"),
        404 => format!("endpoint resource not found: HTTP {code} {reason}"),
        400 | 422 => format!("endpoint rejected request (validation): HTTP {code} {reason}"),
        429 => format!("dependency rate limited: HTTP {code} {reason}"),
        504 => format!("upstream endpoint timed out: HTTP {code} {reason}"),
        500..=599 => format!("upstream endpoint unavailable: HTTP {code} {reason}"),
        _ => format!("endpoint returned HTTP {code} {reason}"),
    }
}

/// Classifier-friendly description of a transport-level HTTP failure
pub fn describe_http_error(err: &HttpError) -> String {
    if err.is_timeout() {
        return "endpoint request timed out".to_string();
    }
    if err.is_connect() {
        return format!("connection to endpoint failed: {err}");
    }
    if let Some(status) = err.status() {
        return describe_http_status(status);
    }
    if err.is_decode() {
        return format!("invalid response from endpoint: {err}");
    }
    format!("http request to endpoint failed: {err}")
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(JobwardenError::Dependency(describe_http_error(&value)))
    }
}

/* -------------------------------------------------------------------------- */
/* Other sources */
/* -------------------------------------------------------------------------- */

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(JobwardenError::Config(format!("Invalid TOML format: {value}")))
    }
}

impl From<JoinError> for InfraError {
    fn from(value: JoinError) -> Self {
        let message = if value.is_panic() { "worker task panicked" } else { "worker task was cancelled" };
        InfraError(JobwardenError::Internal(message.to_string()))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
