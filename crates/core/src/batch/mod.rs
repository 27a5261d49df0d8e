//! Batch processing
//!
//! - [`orchestrator`]: runs a job function over items with retries
//! - [`handler`]: runtime handlers wrapping the orchestrator
//! - [`service`]: submission and tracking API
//! - [`ports`]: job function and progress interfaces

pub mod handler;
pub mod orchestrator;
pub mod ports;
pub mod service;

pub use handler::{BatchTaskHandler, OptimizationTaskHandler};
pub use orchestrator::{BatchOrchestrator, RunOptions};
pub use ports::{BatchPayload, JobFunction, LongRunningJob, NoopProgress, OptimizationPayload, ProgressSink};
pub use service::BatchService;
