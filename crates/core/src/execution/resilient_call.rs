//! Breaker-guarded, time-limited invocation of a job function

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use jobwarden_common::resilience::{CircuitBreaker, CircuitState, Clock, ResilienceError, SystemClock};
use jobwarden_domain::{TaskError, TaskErrorCode};
use serde_json::Value;
use tracing::warn;

use super::job_error::JobError;
use crate::classification::ErrorClassifier;

/// Wraps calls to one dependency with its circuit breaker
///
/// Raw job errors never leave [`ResilientCall::call`]: every failure comes
/// back as a classified [`TaskError`]. Several wrappers may share a breaker.
pub struct ResilientCall<C: Clock = SystemClock> {
    breaker: Arc<CircuitBreaker<C>>,
    classifier: Arc<ErrorClassifier>,
}

impl<C: Clock> Clone for ResilientCall<C> {
    fn clone(&self) -> Self {
        Self { breaker: Arc::clone(&self.breaker), classifier: Arc::clone(&self.classifier) }
    }
}

impl<C: Clock> ResilientCall<C> {
    pub fn new(breaker: Arc<CircuitBreaker<C>>, classifier: Arc<ErrorClassifier>) -> Self {
        Self { breaker, classifier }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker<C>> {
        &self.breaker
    }

    pub fn classifier(&self) -> &Arc<ErrorClassifier> {
        &self.classifier
    }

    /// Invoke `operation` through the breaker
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T, TaskError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, JobError>>,
    {
        self.call_with_context(&BTreeMap::new(), operation).await
    }

    /// Invoke `operation`, attaching `context` to any resulting error
    pub async fn call_with_context<F, Fut, T>(
        &self,
        context: &BTreeMap<String, Value>,
        operation: F,
    ) -> Result<T, TaskError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, JobError>>,
    {
        let dependency = self.breaker.name().to_string();

        self.breaker.execute(operation).await.map_err(|err| match err {
            ResilienceError::CircuitOpen { name, consecutive_failures } => {
                warn!(
                    component = "resilient_call",
                    event = "rejected",
                    dependency = %name,
                    consecutive_failures,
                    "Dependency call rejected by open circuit"
                );
                TaskError::new(
                    TaskErrorCode::DependencyUnavailable,
                    format!("Circuit breaker for '{name}' is open"),
                )
                .with_detail("circuit_state", CircuitState::Open.to_string())
                .with_detail("consecutive_failures", consecutive_failures)
                .with_detail("dependency", name)
                .with_context_map(context)
                .with_max_retries(self.classifier.max_retries())
            }
            ResilienceError::Timeout { timeout } => {
                TaskError::new(
                    TaskErrorCode::DependencyTimeout,
                    format!("Call to '{dependency}' timed out after {}s", timeout.as_secs_f64()),
                )
                .with_detail("timeout_seconds", timeout.as_secs_f64())
                .with_detail("dependency", dependency.clone())
                .with_context_map(context)
                .with_max_retries(self.classifier.max_retries())
            }
            ResilienceError::OperationFailed { error } => self.classifier.classify(&error, context),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use jobwarden_common::resilience::{CircuitBreakerConfig, MockClock};
    use serde_json::json;

    use super::*;

    fn wrapper(threshold: u32, call_timeout: Duration) -> ResilientCall<MockClock> {
        let breaker = CircuitBreakerConfig::builder()
            .name("llm")
            .clock(MockClock::new())
            .failure_threshold(threshold)
            .call_timeout(call_timeout)
            .build()
            .unwrap();
        ResilientCall::new(Arc::new(breaker), Arc::new(ErrorClassifier::default()))
    }

    /// Validates that failures are classified and recorded.
    ///
    /// Assertions:
    /// - A raw error comes back as a classified `TaskError`.
    /// - The breaker recorded the failure.
    #[tokio::test]
    async fn test_failure_is_classified() {
        let call = wrapper(5, Duration::from_secs(1));

        let error = call
            .call(|| async { Err::<(), _>(JobError::msg("HTTP 429 from model provider")) })
            .await
            .unwrap_err();

        assert_eq!(error.code(), TaskErrorCode::DependencyRateLimited);
        assert_eq!(call.breaker().stats().failed_requests, 1);
    }

    /// Validates the open-circuit rejection.
    ///
    /// Assertions:
    /// - Code is `DEPENDENCY_UNAVAILABLE` with breaker context.
    /// - The operation is not run.
    #[tokio::test]
    async fn test_open_circuit_rejects() {
        let call = wrapper(1, Duration::from_secs(1));
        let _ = call.call(|| async { Err::<(), _>(JobError::msg("boom")) }).await;

        let ran = std::sync::atomic::AtomicBool::new(false);
        let error = call
            .call(|| async {
                ran.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, JobError>(())
            })
            .await
            .unwrap_err();

        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(error.code(), TaskErrorCode::DependencyUnavailable);
        assert_eq!(error.details()["circuit_state"], json!("OPEN"));
        assert_eq!(error.details()["consecutive_failures"], json!(1));
    }

    /// Validates the call timeout.
    ///
    /// Assertions:
    /// - Code is `DEPENDENCY_TIMEOUT` with `details.timeout_seconds`.
    /// - The timeout counts as a breaker failure.
    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let call = wrapper(5, Duration::from_millis(500));

        let error = call
            .call(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, JobError>(())
            })
            .await
            .unwrap_err();

        assert_eq!(error.code(), TaskErrorCode::DependencyTimeout);
        assert_eq!(error.details()["timeout_seconds"], json!(0.5));
        assert_eq!(call.breaker().stats().failed_requests, 1);
    }

    #[tokio::test]
    async fn test_success_passes_value() {
        let call = wrapper(5, Duration::from_secs(1));
        let value = call.call(|| async { Ok::<_, JobError>(json!({"ok": true})) }).await.unwrap();
        assert_eq!(value, json!({"ok": true}));
        assert_eq!(call.breaker().stats().successful_requests, 1);
    }
}
