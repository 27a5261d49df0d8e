//! Circuit breaker for a single external dependency
//!
//! The breaker tracks consecutive failures of calls to one dependency and
//! stops admitting calls once a threshold is crossed. After a recovery
//! timeout it lets probe calls through; enough consecutive successes close it
//! again, while any probe failure reopens it.
//!
//! All mutable state lives behind one mutex so concurrent callers sharing a
//! breaker (through `Arc`) never observe a half-applied update.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use crate::collections::RingBuffer;

/// Number of state transitions kept for diagnostics
pub const TRANSITION_HISTORY: usize = 10;

//==============================================================================
// Error Types
//==============================================================================

/// Simple configuration error for validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Configuration result type using simple config errors
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced by [`CircuitBreaker::execute`]
///
/// Generic over the operation's own error so the caller keeps the original
/// failure for classification.
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: fmt::Debug,
{
    /// The breaker rejected the call without running it
    #[error("Circuit breaker '{name}' is open, rejecting calls")]
    CircuitOpen { name: String, consecutive_failures: u32 },

    /// The call did not finish within the configured call timeout
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The underlying operation failed
    #[error("Operation failed: {error:?}")]
    OperationFailed { error: E },
}

/// Result type for breaker-protected operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

//==============================================================================
// State
//==============================================================================

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, admitting probe requests to test recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

//==============================================================================
// Configuration
//==============================================================================

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Dependency identity used in logs and registry lookups
    pub name: String,
    /// Consecutive failures in CLOSED before the circuit opens
    pub failure_threshold: u32,
    /// Time spent OPEN before the next admission check moves to HALF_OPEN
    pub recovery_timeout: Duration,
    /// Consecutive HALF_OPEN successes needed to close the circuit
    pub success_threshold: u32,
    /// Hard limit applied to each protected call
    pub call_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "dependency".to_string(),
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 3,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Preset for a dependency running on the same host
    ///
    /// Local services fail fast and recover fast, but inference can be slow,
    /// so the call timeout is generous.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            call_timeout: Duration::from_secs(60),
            ..Self::default()
        }
    }

    /// Preset for a remote, hosted dependency
    pub fn remote(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            call_timeout: Duration::from_secs(30),
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "failure_threshold must be greater than 0".to_string(),
            });
        }

        if self.success_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "success_threshold must be greater than 0".to_string(),
            });
        }

        if self.call_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                message: "call_timeout must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.recovery_timeout = timeout;
        self
    }

    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.config.success_threshold = threshold;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    /// Switch to building a breaker directly, driven by `clock`
    pub fn clock<C: Clock>(self, clock: C) -> CircuitBreakerBuilderWithClock<C> {
        CircuitBreakerBuilderWithClock { config: self.config, clock }
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Builder with custom clock that builds a CircuitBreaker directly
pub struct CircuitBreakerBuilderWithClock<C: Clock> {
    config: CircuitBreakerConfig,
    clock: C,
}

impl<C: Clock> CircuitBreakerBuilderWithClock<C> {
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.recovery_timeout = timeout;
        self
    }

    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.config.success_threshold = threshold;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreaker<C>> {
        CircuitBreaker::with_clock(self.config, self.clock)
    }
}

//==============================================================================
// Statistics
//==============================================================================

/// One recorded state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub timestamp: DateTime<Utc>,
    pub from_state: CircuitState,
    pub to_state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
}

/// Snapshot of a breaker's counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_success_time: Option<DateTime<Utc>>,
    /// Most recent transitions, oldest first
    pub state_changes: Vec<StateTransition>,
}

/// Serializable description of a breaker for operators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerReport {
    pub name: String,
    pub state: CircuitState,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: f64,
    pub success_threshold: u32,
    pub call_timeout_secs: f64,
    pub stats: CircuitBreakerStats,
}

struct BreakerInner {
    state: CircuitState,
    last_state_change: Instant,
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure_time: Option<DateTime<Utc>>,
    last_success_time: Option<DateTime<Utc>>,
    transitions: RingBuffer<StateTransition>,
}

impl BreakerInner {
    fn new(now: Instant) -> Self {
        Self {
            state: CircuitState::Closed,
            last_state_change: now,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_failure_time: None,
            last_success_time: None,
            transitions: RingBuffer::new(TRANSITION_HISTORY),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 1.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}

//==============================================================================
// Circuit Breaker
//==============================================================================

/// Circuit breaker protecting one logical dependency
///
/// Share it between callers with `Arc<CircuitBreaker<C>>`. The clock is a
/// type parameter so tests can drive recovery timeouts with
/// [`MockClock`](super::clock::MockClock).
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    clock: C,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.config.name)
            .field("state", &inner.state)
            .field("consecutive_failures", &inner.consecutive_failures)
            .field("consecutive_successes", &inner.consecutive_successes)
            .finish()
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a breaker driven by the system clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a breaker using the builder pattern
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a breaker with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        let inner = Mutex::new(BreakerInner::new(clock.now()));
        Ok(Self { config, inner, clock })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Admission check
    ///
    /// CLOSED and HALF_OPEN admit. OPEN rejects until `recovery_timeout` has
    /// elapsed since the last transition; the first check after that moves
    /// the breaker to HALF_OPEN and admits.
    pub fn should_attempt(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self.clock.now().saturating_duration_since(inner.last_state_change);
                if elapsed >= self.config.recovery_timeout {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.total_requests += 1;
        inner.successful_requests += 1;
        inner.consecutive_successes = inner.consecutive_successes.saturating_add(1);
        inner.consecutive_failures = 0;
        inner.last_success_time = Some(self.clock.wall_time());

        match inner.state {
            CircuitState::HalfOpen => {
                if inner.consecutive_successes >= self.config.success_threshold {
                    self.transition(&mut inner, CircuitState::Closed);
                    inner.consecutive_successes = 0;
                }
            }
            CircuitState::Open => {
                debug!(
                    component = "circuit_breaker",
                    event = "late_success",
                    dependency = %self.config.name,
                    "Success recorded while circuit is open"
                );
            }
            CircuitState::Closed => {}
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.total_requests += 1;
        inner.failed_requests += 1;
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.consecutive_successes = 0;
        inner.last_failure_time = Some(self.clock.wall_time());

        match inner.state {
            CircuitState::Closed => {
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Open),
            CircuitState::Open => {}
        }
    }

    /// Current state, without applying the time-based transition
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Snapshot of the counters and recent transitions
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        CircuitBreakerStats {
            total_requests: inner.total_requests,
            successful_requests: inner.successful_requests,
            failed_requests: inner.failed_requests,
            success_rate: inner.success_rate(),
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            last_failure_time: inner.last_failure_time,
            last_success_time: inner.last_success_time,
            state_changes: inner.transitions.to_vec(),
        }
    }

    /// Operator-facing report including configuration
    pub fn report(&self) -> CircuitBreakerReport {
        let stats = self.stats();
        CircuitBreakerReport {
            name: self.config.name.clone(),
            state: self.state(),
            failure_threshold: self.config.failure_threshold,
            recovery_timeout_secs: self.config.recovery_timeout.as_secs_f64(),
            success_threshold: self.config.success_threshold,
            call_timeout_secs: self.config.call_timeout.as_secs_f64(),
            stats,
        }
    }

    /// Force the breaker back to CLOSED and clear consecutive counters
    ///
    /// Totals and the transition history are kept.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed);
        }
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        info!(
            component = "circuit_breaker",
            event = "reset",
            dependency = %self.config.name,
            "Circuit breaker manually reset to closed state"
        );
    }

    /// Execute an operation with admission check, call timeout and
    /// bookkeeping
    ///
    /// A rejected call never runs `operation`. Timeouts and operation errors
    /// both count as failures.
    #[instrument(skip(self, operation), fields(dependency = %self.config.name))]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Debug,
    {
        if !self.should_attempt() {
            let consecutive_failures = self.inner.lock().consecutive_failures;
            debug!(
                component = "circuit_breaker",
                event = "call_rejected",
                consecutive_failures,
                "Circuit breaker rejecting call"
            );
            return Err(ResilienceError::CircuitOpen {
                name: self.config.name.clone(),
                consecutive_failures,
            });
        }

        match tokio::time::timeout(self.config.call_timeout, operation()).await {
            Ok(Ok(value)) => {
                self.record_success();
                Ok(value)
            }
            Ok(Err(error)) => {
                self.record_failure();
                Err(ResilienceError::OperationFailed { error })
            }
            Err(_) => {
                self.record_failure();
                warn!(
                    component = "circuit_breaker",
                    event = "call_timeout",
                    timeout_secs = self.config.call_timeout.as_secs_f64(),
                    "Protected call timed out"
                );
                Err(ResilienceError::Timeout { timeout: self.config.call_timeout })
            }
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        inner.last_state_change = self.clock.now();
        inner.transitions.push(StateTransition {
            timestamp: self.clock.wall_time(),
            from_state: from,
            to_state: to,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
        });

        if to == CircuitState::Open {
            warn!(
                component = "circuit_breaker",
                event = "state_transition",
                dependency = %self.config.name,
                from = %from,
                to = %to,
                consecutive_failures = inner.consecutive_failures,
                "Circuit breaker opened"
            );
        } else {
            info!(
                component = "circuit_breaker",
                event = "state_transition",
                dependency = %self.config.name,
                from = %from,
                to = %to,
                consecutive_successes = inner.consecutive_successes,
                "Circuit breaker state changed"
            );
        }
    }
}
