//! Policy-driven retry executor
//!
//! [`RetryExecutor`] runs an async operation until it succeeds, the policy
//! stops it, the attempt budget runs out, or an optional total-time budget
//! expires. Backoff waits go through a [`Sleeper`] so callers and tests can
//! replace the real timer.
//!
//! The executor never loses the last error: both exhaustion and
//! non-retryable failures hand it back to the caller for reporting.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during retry operations
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// All retry attempts have been exhausted
    #[error("All retry attempts exhausted after {attempts} tries")]
    Exhausted { attempts: u32, last_error: E },

    /// The operation failed with an error the policy refused to retry
    #[error("Operation failed with non-retryable error after {attempts} tries")]
    NonRetryable { attempts: u32, error: E },

    /// The retry configuration is invalid
    #[error("Invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The total time budget ran out before another attempt could start
    #[error("Retry timeout exceeded after {elapsed:?}")]
    TimeoutExceeded { elapsed: Duration, attempts: u32, last_error: Option<E> },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. }
            | RetryError::NonRetryable { attempts, .. }
            | RetryError::TimeoutExceeded { attempts, .. } => *attempts,
            RetryError::InvalidConfiguration { .. } => 0,
        }
    }

    /// The last error produced by the operation, if any
    pub fn into_last_error(self) -> Option<E> {
        match self {
            RetryError::Exhausted { last_error, .. } => Some(last_error),
            RetryError::NonRetryable { error, .. } => Some(error),
            RetryError::TimeoutExceeded { last_error, .. } => last_error,
            RetryError::InvalidConfiguration { .. } => None,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Outcome of a retry execution including result and summary statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
    pub total_delay: Duration,
    pub timed_out: bool,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Decide whether to retry after `error` on zero-based `attempt`
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the configured backoff delay
    Retry,
    /// Retry the operation after a policy-chosen delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: `min(initial_delay * base^attempt, max_delay)`
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Doubling backoff capped at `max_delay`
    pub fn exponential(initial_delay: Duration, max_delay: Duration) -> Self {
        BackoffStrategy::Exponential { initial_delay, base: 2.0, max_delay }
    }

    /// Calculate the delay before the retry that follows `attempt`
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay = initial_delay.as_millis() as f64 * base.powi(exponent);
                let capped = delay.min(max_delay.as_millis() as f64);
                if capped.is_finite() && capped > 0.0 {
                    Duration::from_millis(capped as u64)
                } else if capped > 0.0 {
                    *max_delay
                } else {
                    Duration::ZERO
                }
            }
        }
    }
}

/// Jitter type for adding randomness to retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// No jitter
    None,
    /// Full jitter: 0 to calculated_delay
    Full,
    /// Equal jitter: calculated_delay/2 to calculated_delay
    Equal,
}

impl Jitter {
    /// Apply jitter to the calculated delay
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply(self, delay: Duration) -> Duration {
        let millis = delay.as_millis() as u64;
        match self {
            Jitter::None => delay,
            Jitter::Full => Duration::from_millis(random_up_to(millis)),
            Jitter::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + random_up_to(millis - half))
            }
        }
    }
}

fn random_up_to(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=max)
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
    /// Jitter type for randomizing delays
    pub jitter: Jitter,
    /// Maximum total time to spend retrying
    pub max_total_time: Option<Duration>,
}

impl Default for RetryConfig {
    /// One attempt plus three retries, doubling from 1s up to 30s.
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: BackoffStrategy::exponential(Duration::from_secs(1), Duration::from_secs(30)),
            jitter: Jitter::None,
            max_total_time: None,
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Configuration allowing `max_retries` retries after the first attempt
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_attempts: max_retries.saturating_add(1), ..Self::default() }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RetryError<()>> {
        if self.max_attempts == 0 {
            return Err(RetryError::InvalidConfiguration {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }

        if let BackoffStrategy::Exponential { base, .. } = &self.backoff {
            if *base <= 0.0 {
                return Err(RetryError::InvalidConfiguration {
                    message: "exponential base must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_attempts = retries.saturating_add(1);
        self
    }

    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    pub fn exponential_backoff(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::exponential(initial_delay, max_delay);
        self
    }

    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.config.jitter = jitter;
        self
    }

    pub fn max_total_time(mut self, duration: Duration) -> Self {
        self.config.max_total_time = Some(duration);
        self
    }

    pub fn build(self) -> Result<RetryConfig, RetryError<()>> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//==============================================================================
// Sleeping
//==============================================================================

/// Suspends the retry loop between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

//==============================================================================
// Executor
//==============================================================================

/// The main retry executor
pub struct RetryExecutor<P, S = TokioSleeper> {
    config: RetryConfig,
    policy: P,
    sleeper: S,
}

impl<P> RetryExecutor<P, TokioSleeper> {
    /// Create a new retry executor with the given configuration and policy
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy, sleeper: TokioSleeper }
    }
}

impl<P, S: Sleeper> RetryExecutor<P, S> {
    /// Create an executor with a custom sleeper
    pub fn with_sleeper(config: RetryConfig, policy: P, sleeper: S) -> Self {
        Self { config, policy, sleeper }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics.
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let max_attempts = self.config.max_attempts.max(1);
        let mut total_delay = Duration::ZERO;
        let mut last_error: Option<E> = None;
        let mut attempt: u32 = 0;

        loop {
            if let Some(max_time) = self.config.max_total_time {
                let elapsed = start.elapsed();
                if attempt > 0 && elapsed >= max_time {
                    warn!(
                        component = "retry",
                        event = "time_budget_exceeded",
                        attempts = attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Retry time budget exceeded"
                    );
                    return RetryOutcome {
                        result: Err(RetryError::TimeoutExceeded {
                            elapsed,
                            attempts: attempt,
                            last_error,
                        }),
                        attempts: attempt,
                        total_delay,
                        timed_out: true,
                    };
                }
            }

            attempt += 1;
            debug!(component = "retry", event = "attempt", attempt, max_attempts, "Executing operation");

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(component = "retry", event = "recovered", attempt, "Operation succeeded after retry");
                    }
                    return RetryOutcome { result: Ok(value), attempts: attempt, total_delay, timed_out: false };
                }
                Err(error) => error,
            };

            if attempt >= max_attempts {
                warn!(
                    component = "retry",
                    event = "exhausted",
                    attempts = attempt,
                    error = %error,
                    "All retry attempts exhausted"
                );
                return RetryOutcome {
                    result: Err(RetryError::Exhausted { attempts: attempt, last_error: error }),
                    attempts: attempt,
                    total_delay,
                    timed_out: false,
                };
            }

            let delay = match self.policy.should_retry(&error, attempt - 1) {
                RetryDecision::Stop => {
                    debug!(
                        component = "retry",
                        event = "stopped",
                        attempts = attempt,
                        error = %error,
                        "Retry policy declined to retry"
                    );
                    return RetryOutcome {
                        result: Err(RetryError::NonRetryable { attempts: attempt, error }),
                        attempts: attempt,
                        total_delay,
                        timed_out: false,
                    };
                }
                RetryDecision::Retry => {
                    self.config.jitter.apply(self.config.backoff.calculate_delay(attempt - 1))
                }
                RetryDecision::RetryAfter(delay) => delay,
            };

            warn!(
                component = "retry",
                event = "retry_scheduled",
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Operation failed, retrying after backoff"
            );
            last_error = Some(error);
            self.sleeper.sleep(delay).await;
            total_delay += delay;
        }
    }
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Always retry policy - retries on any error
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retry policy - never retries
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}
