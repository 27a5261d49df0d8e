//! Retry decisions and backoff for classified errors

use std::time::Duration;

use jobwarden_common::resilience::{BackoffStrategy, RetryDecision, RetryPolicy};
use jobwarden_domain::constants::{DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_CAP_MS};
use jobwarden_domain::{RetrySettings, TaskError};

/// Whether `error` may be attempted again
pub fn should_retry(error: &TaskError) -> bool {
    error.is_retryable() && error.retry_count() < error.max_retries()
}

/// `min(base * 2^retry_count, cap)`
pub fn backoff_delay(retry_count: u32, base: Duration, cap: Duration) -> Duration {
    BackoffStrategy::exponential(base, cap).calculate_delay(retry_count)
}

/// Retry policy for [`TaskError`]s
///
/// Stops on non-retryable codes and exhausted budgets; otherwise asks for a
/// retry after the exponential delay for the error's retry count.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRetryPolicy {
    backoff: BackoffStrategy,
}

impl Default for TaskRetryPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            Duration::from_millis(DEFAULT_BACKOFF_CAP_MS),
        )
    }
}

impl TaskRetryPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { backoff: BackoffStrategy::exponential(base, cap) }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.base_delay(), settings.max_delay())
    }

    pub fn delay_for(&self, error: &TaskError) -> Duration {
        self.backoff.calculate_delay(error.retry_count())
    }
}

impl RetryPolicy<TaskError> for TaskRetryPolicy {
    fn should_retry(&self, error: &TaskError, _attempt: u32) -> RetryDecision {
        if should_retry(error) {
            RetryDecision::RetryAfter(self.delay_for(error))
        } else {
            RetryDecision::Stop
        }
    }
}
