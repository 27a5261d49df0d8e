//! Application constants
//!
//! Centralized location for domain-level defaults shared by the services and
//! the configuration layer.

// Retry defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 30_000;

// Circuit breaker defaults
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 3;
pub const DEFAULT_RECOVERY_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;
pub const STATE_TRANSITION_HISTORY: usize = 10;

// Time limits for long-running tasks
pub const TASK_HARD_TIME_LIMIT_SECS: u64 = 3_600;
pub const TASK_SOFT_TIME_LIMIT_SECS: u64 = 3_300;
/// How long finished task records are kept before cleanup drops them
pub const TASK_RESULT_RETENTION_SECS: u64 = 3_600;

// Queue names
pub const QUEUE_DEFAULT: &str = "default";
pub const QUEUE_BATCH: &str = "batch";
pub const QUEUE_OPTIMIZATION: &str = "optimization";
pub const KNOWN_QUEUES: [&str; 3] = [QUEUE_DEFAULT, QUEUE_BATCH, QUEUE_OPTIMIZATION];

// Registered task names
pub const TASK_BATCH_PROCESS: &str = "jobwarden.batch.process_items";
pub const TASK_OPTIMIZE: &str = "jobwarden.optimization.run";
