//! Port interfaces for batch processing

use async_trait::async_trait;
use jobwarden_domain::BatchProgress;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::execution::JobError;

/// The unit of work applied to each item of a batch
#[async_trait]
pub trait JobFunction: Send + Sync {
    /// Process one item and return its result document
    async fn run(&self, item_id: &str) -> Result<Value, JobError>;
}

/// A single long-running unit of work driven by a configuration document
#[async_trait]
pub trait LongRunningJob: Send + Sync {
    async fn run(&self, config: &Value) -> Result<Value, JobError>;
}

/// Receives progress snapshots while a batch runs
pub trait ProgressSink: Send + Sync {
    fn publish(&self, progress: BatchProgress);
}

/// Sink that drops every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn publish(&self, _progress: BatchProgress) {}
}

/// Payload of a batch-processing task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPayload {
    pub item_ids: Vec<String>,
    pub max_retries: u32,
}

/// Payload of an optimization task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationPayload {
    pub config: Value,
    pub max_retries: u32,
}
