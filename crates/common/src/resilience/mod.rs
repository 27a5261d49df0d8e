//! Resilience patterns for calls to unreliable dependencies
//!
//! - **Circuit Breaker**: stops calling a dependency after repeated failures
//!   and probes it again after a recovery timeout
//! - **Registry**: one shared breaker per dependency name
//! - **Retry Logic**: policy-driven retries with exponential backoff and
//!   pluggable sleeping
//!
//! Everything here is generic over the caller's error type. Task-specific
//! classification lives in `jobwarden-core`.

pub mod circuit_breaker;
pub mod clock;
pub mod registry;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerReport,
    CircuitBreakerStats, CircuitState, ConfigError, ConfigResult, ResilienceError,
    ResilienceResult, StateTransition,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use registry::{CircuitBreakerRegistry, RegistryError};
pub use retry::{
    policies, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError,
    RetryExecutor, RetryOutcome, RetryPolicy, RetryResult, Sleeper, TokioSleeper,
};
