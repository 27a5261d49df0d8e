//! Task handlers that run batches and long-running jobs inside the runtime

use std::sync::Arc;

use async_trait::async_trait;
use jobwarden_common::resilience::{Clock, Sleeper, SystemClock, TokioSleeper};
use jobwarden_domain::constants::{TASK_BATCH_PROCESS, TASK_OPTIMIZE};
use jobwarden_domain::{JobwardenError, Result};
use serde_json::Value;
use tracing::info;

use super::orchestrator::{BatchOrchestrator, RunOptions};
use super::ports::{BatchPayload, JobFunction, LongRunningJob, OptimizationPayload};
use crate::queue::ports::{TaskContext, TaskHandler};

fn run_options(context: &TaskContext) -> RunOptions {
    let options = RunOptions::default()
        .with_cancellation(context.cancellation.clone())
        .with_progress(Arc::clone(&context.progress));
    match context.soft_time_limit {
        Some(limit) => options.with_time_budget(limit),
        None => options,
    }
}

/// Handles `TASK_BATCH_PROCESS` submissions
pub struct BatchTaskHandler<C: Clock = SystemClock, S: Sleeper + Clone = TokioSleeper> {
    orchestrator: Arc<BatchOrchestrator<C, S>>,
    job: Arc<dyn JobFunction>,
}

impl<C: Clock, S: Sleeper + Clone> BatchTaskHandler<C, S> {
    pub fn new(orchestrator: Arc<BatchOrchestrator<C, S>>, job: Arc<dyn JobFunction>) -> Self {
        Self { orchestrator, job }
    }
}

#[async_trait]
impl<C: Clock, S: Sleeper + Clone> TaskHandler for BatchTaskHandler<C, S> {
    fn name(&self) -> &str {
        TASK_BATCH_PROCESS
    }

    async fn handle(&self, payload: Value, context: TaskContext) -> Result<Value> {
        let payload: BatchPayload = serde_json::from_value(payload)
            .map_err(|err| JobwardenError::InvalidInput(format!("Invalid batch payload: {err}")))?;

        info!(
            component = "batch_handler",
            event = "batch_task_started",
            task_id = %context.task_id,
            items = payload.item_ids.len(),
            "Processing batch task"
        );

        let result = self
            .orchestrator
            .run_batch(&payload.item_ids, self.job.as_ref(), payload.max_retries, run_options(&context))
            .await;
        Ok(serde_json::to_value(result)?)
    }
}

/// Handles `TASK_OPTIMIZE` submissions
pub struct OptimizationTaskHandler<C: Clock = SystemClock, S: Sleeper + Clone = TokioSleeper> {
    orchestrator: Arc<BatchOrchestrator<C, S>>,
    job: Arc<dyn LongRunningJob>,
}

impl<C: Clock, S: Sleeper + Clone> OptimizationTaskHandler<C, S> {
    pub fn new(orchestrator: Arc<BatchOrchestrator<C, S>>, job: Arc<dyn LongRunningJob>) -> Self {
        Self { orchestrator, job }
    }
}

#[async_trait]
impl<C: Clock, S: Sleeper + Clone> TaskHandler for OptimizationTaskHandler<C, S> {
    fn name(&self) -> &str {
        TASK_OPTIMIZE
    }

    async fn handle(&self, payload: Value, context: TaskContext) -> Result<Value> {
        let payload: OptimizationPayload = serde_json::from_value(payload)
            .map_err(|err| JobwardenError::InvalidInput(format!("Invalid optimization payload: {err}")))?;

        info!(
            component = "optimization_handler",
            event = "optimization_started",
            task_id = %context.task_id,
            "Running optimization job"
        );

        let outcome = self
            .orchestrator
            .run_long_job(self.job.as_ref(), &payload.config, payload.max_retries, run_options(&context))
            .await;

        match (outcome.result, outcome.error) {
            (Some(result), _) => Ok(result),
            (None, Some(error)) => Err(JobwardenError::Dependency(error.to_string())),
            (None, None) => Ok(Value::Null),
        }
    }
}
