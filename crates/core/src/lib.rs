//! # Jobwarden Core
//!
//! Business logic for resilient background task execution.
//!
//! This crate contains:
//! - Failure classification into the task error taxonomy
//! - The resilient call wrapper (circuit breaker plus classification)
//! - Batch orchestration with per-item retries, budgets and cancellation
//! - Queue monitoring and the batch submission service
//! - Port interfaces for the task runtime and job functions
//!
//! ## Architecture Principles
//! - Depends only on `jobwarden-common` and `jobwarden-domain`
//! - No HTTP, config-file or process-wide state
//! - The task runtime and job functions arrive through traits

pub mod batch;
pub mod classification;
pub mod execution;
pub mod queue;

pub use batch::{
    BatchOrchestrator, BatchService, BatchTaskHandler, JobFunction, LongRunningJob,
    OptimizationTaskHandler, ProgressSink, RunOptions,
};
pub use classification::ErrorClassifier;
pub use execution::{JobError, ResilientCall};
pub use queue::{QueueMonitor, TaskContext, TaskHandler, TaskRuntime};
