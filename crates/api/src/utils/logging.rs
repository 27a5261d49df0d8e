use std::time::Duration;

use jobwarden_domain::JobwardenError;
use tracing::{info, warn};

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"batches::submit_batch"`).
/// * `elapsed` - Duration the command execution took.
/// * `error_type` - Stable error label when the command failed.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error_type: Option<&str>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match error_type {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(error_type) => warn!(command, duration_ms, error_type, "command_execution_failure"),
    }
}

/// Convert a `JobwardenError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &JobwardenError) -> &'static str {
    match error {
        JobwardenError::Config(_) => "config",
        JobwardenError::Runtime(_) => "runtime",
        JobwardenError::Dependency(_) => "dependency",
        JobwardenError::NotFound(_) => "not_found",
        JobwardenError::InvalidInput(_) => "invalid_input",
        JobwardenError::Serialization(_) => "serialization",
        JobwardenError::Internal(_) => "internal",
    }
}
