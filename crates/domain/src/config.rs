//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_CAP_MS, DEFAULT_CALL_TIMEOUT_SECS,
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_MAX_RETRIES, DEFAULT_RECOVERY_TIMEOUT_SECS,
    DEFAULT_SUCCESS_THRESHOLD, KNOWN_QUEUES, TASK_HARD_TIME_LIMIT_SECS,
    TASK_RESULT_RETENTION_SECS, TASK_SOFT_TIME_LIMIT_SECS,
};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub breaker: BreakerConfig,
    pub retry: RetrySettings,
    pub batch: BatchConfig,
    pub queues: QueueConfig,
    pub dependency: DependencyConfig,
    pub logging: LoggingConfig,
}

/// Default circuit breaker settings for dependencies without a preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
    pub success_threshold: u32,
    pub call_timeout_secs: u64,
}

impl BreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout_secs: DEFAULT_RECOVERY_TIMEOUT_SECS,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
        }
    }
}

/// Per-item retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BACKOFF_BASE_MS,
            max_delay_ms: DEFAULT_BACKOFF_CAP_MS,
        }
    }
}

/// Batch execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// In-flight items per batch run; 1 means strictly sequential
    pub max_concurrency: usize,
    /// Tasks the in-process runtime executes at once
    pub worker_concurrency: usize,
    /// Budget after which a batch returns a partial result
    pub soft_time_limit_secs: u64,
    /// Budget after which the runtime revokes the task outright
    pub hard_time_limit_secs: u64,
    /// Age after which finished task records are dropped
    pub result_retention_secs: u64,
}

impl BatchConfig {
    pub fn soft_time_limit(&self) -> Duration {
        Duration::from_secs(self.soft_time_limit_secs)
    }

    pub fn hard_time_limit(&self) -> Duration {
        Duration::from_secs(self.hard_time_limit_secs)
    }

    pub fn result_retention(&self) -> Duration {
        Duration::from_secs(self.result_retention_secs)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            worker_concurrency: 4,
            soft_time_limit_secs: TASK_SOFT_TIME_LIMIT_SECS,
            hard_time_limit_secs: TASK_HARD_TIME_LIMIT_SECS,
            result_retention_secs: TASK_RESULT_RETENTION_SECS,
        }
    }
}

/// Queues the monitor reports on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub known: Vec<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { known: KNOWN_QUEUES.iter().map(ToString::to_string).collect() }
    }
}

/// The external dependency work items call out to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyConfig {
    /// Model identity; selects the breaker preset (`ollama/...` is local)
    pub model: String,
    /// Endpoint receiving one POST per item
    pub endpoint: Option<String>,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self { model: "ollama/llama3".to_string(), endpoint: None }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = Config::default();
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.success_threshold, 3);
        assert_eq!(config.breaker.recovery_timeout(), Duration::from_secs(60));
        assert_eq!(config.retry.base_delay(), Duration::from_secs(1));
        assert_eq!(config.retry.max_delay(), Duration::from_secs(30));
        assert_eq!(config.batch.max_concurrency, 1);
        assert_eq!(config.queues.known, vec!["default", "batch", "optimization"]);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "retry": { "max_retries": 7 } }"#).unwrap();

        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(config.retry.base_delay_ms, DEFAULT_BACKOFF_BASE_MS);
        assert_eq!(config.breaker, BreakerConfig::default());
    }
}
