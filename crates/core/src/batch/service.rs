//! Batch service: submission, status, results and cancellation of jobs

use std::sync::Arc;

use chrono::Utc;
use jobwarden_domain::constants::{QUEUE_BATCH, QUEUE_OPTIMIZATION, TASK_BATCH_PROCESS, TASK_OPTIMIZE};
use jobwarden_domain::{
    BatchJob, BatchJobType, BatchStatusReport, JobwardenError, Result, TaskInfo, TaskPriority,
    TaskState, TaskSubmission,
};
use serde_json::Value;
use tracing::{info, instrument};

use super::ports::{BatchPayload, OptimizationPayload};
use crate::queue::ports::TaskRuntime;

/// Front door for submitting and tracking background jobs
pub struct BatchService {
    runtime: Arc<dyn TaskRuntime>,
    default_max_retries: u32,
}

impl BatchService {
    pub fn new(runtime: Arc<dyn TaskRuntime>, default_max_retries: u32) -> Self {
        Self { runtime, default_max_retries }
    }

    /// Submit a batch of items to the `batch` queue
    #[instrument(skip(self, item_ids), fields(items = item_ids.len()))]
    pub async fn submit_batch(
        &self,
        item_ids: Vec<String>,
        max_retries: Option<u32>,
        priority: TaskPriority,
        created_by: Option<String>,
    ) -> Result<BatchJob> {
        if item_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(JobwardenError::InvalidInput("Item ids must not be empty".to_string()));
        }

        let item_count = item_ids.len();
        let payload = BatchPayload { item_ids, max_retries: max_retries.unwrap_or(self.default_max_retries) };
        let submission = TaskSubmission::new(TASK_BATCH_PROCESS, QUEUE_BATCH, serde_json::to_value(payload)?)
            .with_priority(priority);
        let task_id = self.runtime.submit(submission).await?;

        info!(component = "batch_service", event = "batch_submitted", task_id = %task_id, item_count, "Batch submitted");

        Ok(BatchJob {
            task_id,
            job_type: BatchJobType::BatchProcessing,
            description: format!("Batch processing of {item_count} items"),
            created_by,
            created_at: Utc::now(),
            item_count,
            priority,
        })
    }

    /// Submit a single long-running optimization job
    #[instrument(skip(self, config))]
    pub async fn submit_optimization_job(
        &self,
        config: Value,
        max_retries: Option<u32>,
        priority: TaskPriority,
        created_by: Option<String>,
    ) -> Result<BatchJob> {
        if !config.is_object() {
            return Err(JobwardenError::InvalidInput("Optimization config must be a JSON object".to_string()));
        }

        let payload = OptimizationPayload { config, max_retries: max_retries.unwrap_or(self.default_max_retries) };
        let submission = TaskSubmission::new(TASK_OPTIMIZE, QUEUE_OPTIMIZATION, serde_json::to_value(payload)?)
            .with_priority(priority);
        let task_id = self.runtime.submit(submission).await?;

        info!(component = "batch_service", event = "optimization_submitted", task_id = %task_id, "Optimization job submitted");

        Ok(BatchJob {
            task_id,
            job_type: BatchJobType::Optimization,
            description: "Optimization job".to_string(),
            created_by,
            created_at: Utc::now(),
            item_count: 1,
            priority,
        })
    }

    /// Status with progress percentage; unknown ids report `PENDING`
    pub async fn get_batch_status(&self, task_id: &str) -> Result<BatchStatusReport> {
        Ok(self.runtime.status(task_id).await?.into())
    }

    /// Result document, available only once the task succeeded
    pub async fn get_batch_results(&self, task_id: &str) -> Result<Option<Value>> {
        let report = self.runtime.status(task_id).await?;
        Ok(match report.status {
            TaskState::Success => report.result,
            _ => None,
        })
    }

    /// Revoke and terminate a batch; returns whether it was revoked
    #[instrument(skip(self))]
    pub async fn cancel_batch(&self, task_id: &str) -> Result<bool> {
        let revoked = self.runtime.revoke(task_id, true).await?;
        info!(component = "batch_service", event = "batch_cancelled", task_id, revoked, "Batch cancellation requested");
        Ok(revoked)
    }

    /// Active tasks that are batch or optimization jobs
    pub async fn list_active_batches(&self) -> Result<Vec<TaskInfo>> {
        Ok(self
            .runtime
            .active_tasks()
            .await?
            .into_iter()
            .filter(|task| task.name == TASK_BATCH_PROCESS || task.name == TASK_OPTIMIZE)
            .collect())
    }
}
