//! Batch and optimization job commands

use std::time::Duration;

use jobwarden_core::RunOptions;
use jobwarden_domain::{
    BatchJob, BatchJobResult, BatchStatusReport, JobwardenError, Result, TaskInfo, TaskPriority,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::context::AppContext;
use crate::utils::command_helpers::execute_logged;

/// Arguments of `submit_batch`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBatchRequest {
    pub item_ids: Vec<String>,
    /// Falls back to the configured retry budget
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Outcome of `cancel_batch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub task_id: String,
    pub cancelled: bool,
}

// =============================================================================
// Submission
// =============================================================================

/// Queue a batch of items for background processing.
pub async fn submit_batch(ctx: &AppContext, request: SubmitBatchRequest) -> Result<BatchJob> {
    execute_logged("batches::submit_batch", || async {
        if request.item_ids.is_empty() {
            return Err(JobwardenError::InvalidInput("At least one item id is required".to_string()));
        }
        ctx.batches
            .submit_batch(request.item_ids, request.max_retries, request.priority, request.created_by)
            .await
    })
    .await
}

/// Queue a single long-running optimization job.
pub async fn submit_optimization(
    ctx: &AppContext,
    config: Value,
    max_retries: Option<u32>,
    priority: TaskPriority,
    created_by: Option<String>,
) -> Result<BatchJob> {
    execute_logged("batches::submit_optimization", || async {
        ctx.batches.submit_optimization_job(config, max_retries, priority, created_by).await
    })
    .await
}

// =============================================================================
// Tracking
// =============================================================================

pub async fn get_batch_status(ctx: &AppContext, task_id: &str) -> Result<BatchStatusReport> {
    execute_logged("batches::get_batch_status", || ctx.batches.get_batch_status(task_id)).await
}

/// Results of a finished batch; `None` until the task has succeeded.
pub async fn get_batch_results(ctx: &AppContext, task_id: &str) -> Result<Option<Value>> {
    execute_logged("batches::get_batch_results", || ctx.batches.get_batch_results(task_id)).await
}

pub async fn cancel_batch(ctx: &AppContext, task_id: &str) -> Result<CancelResponse> {
    execute_logged("batches::cancel_batch", || async {
        let cancelled = ctx.batches.cancel_batch(task_id).await?;
        Ok(CancelResponse { task_id: task_id.to_string(), cancelled })
    })
    .await
}

pub async fn list_active_batches(ctx: &AppContext) -> Result<Vec<TaskInfo>> {
    execute_logged("batches::list_active_batches", || ctx.batches.list_active_batches()).await
}

/// Poll a task until it reaches a terminal state.
///
/// # Errors
///
/// Returns `JobwardenError::Runtime` if the task is still running after
/// `timeout`.
pub async fn wait_for_batch(
    ctx: &AppContext,
    task_id: &str,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<BatchStatusReport> {
    execute_logged("batches::wait_for_batch", || async {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let report = ctx.batches.get_batch_status(task_id).await?;
            if report.status.is_terminal() {
                return Ok(report);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(JobwardenError::Runtime(format!(
                    "Task {task_id} still {} after {}s",
                    report.status,
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    })
    .await
}

// =============================================================================
// In-process execution
// =============================================================================

/// Run a batch in the foreground, bypassing the task runtime.
///
/// The configured soft time limit still bounds the run.
pub async fn run_batch(ctx: &AppContext, item_ids: Vec<String>, max_retries: Option<u32>) -> Result<BatchJobResult> {
    execute_logged("batches::run_batch", || async {
        let jobs = ctx.jobs().ok_or_else(|| {
            JobwardenError::Config("No dependency endpoint configured for run-batch".to_string())
        })?;
        let max_retries = max_retries.unwrap_or(ctx.config.retry.max_retries);
        info!(command = "batches::run_batch", items = item_ids.len(), max_retries, "Running batch in foreground");

        let options = RunOptions::default().with_time_budget(ctx.config.batch.soft_time_limit());
        Ok(ctx.orchestrator.run_batch(&item_ids, jobs.batch.as_ref(), max_retries, options).await)
    })
    .await
}
