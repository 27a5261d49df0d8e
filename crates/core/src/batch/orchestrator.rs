//! Batch orchestrator: runs a job function over many items
//!
//! Each item goes through the resilient call wrapper inside a retry loop.
//! A failed item is recorded and the batch moves on; only the time budget
//! or cancellation ends a run early.
//!
//! Items are consumed in submission order. With `max_concurrency > 1` up to
//! that many items are in flight at once, but outcomes and progress are
//! still recorded in submission order.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use jobwarden_common::resilience::{Clock, RetryConfig, RetryExecutor, Sleeper, SystemClock, TokioSleeper};
use jobwarden_domain::{BatchJobResult, BatchProgress, BatchRunStatus, ItemOutcome, TaskError, TaskErrorCode};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::ports::{JobFunction, LongRunningJob, NoopProgress, ProgressSink};
use crate::classification::TaskRetryPolicy;
use crate::execution::{JobError, ResilientCall};

/// Item id used for single long-running jobs
pub const LONG_RUNNING_ITEM_ID: &str = "optimization";

/// Per-run knobs
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Stop and return a partial result once this much time has passed
    pub time_budget: Option<Duration>,
    /// Mark in-flight and remaining items cancelled once triggered
    pub cancellation: Option<CancellationToken>,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl RunOptions {
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }
}

enum Guarded {
    Finished(ItemOutcome),
    Cancelled,
    TimedOut,
}

type TaskRetryExecutor<S> = RetryExecutor<TaskRetryPolicy, S>;

/// Runs batches of items against one dependency
pub struct BatchOrchestrator<C: Clock = SystemClock, S: Sleeper + Clone = TokioSleeper> {
    call: ResilientCall<C>,
    policy: TaskRetryPolicy,
    sleeper: S,
    max_concurrency: usize,
}

impl<C: Clock> BatchOrchestrator<C, TokioSleeper> {
    /// Sequential orchestrator sleeping on the tokio timer
    pub fn new(call: ResilientCall<C>, policy: TaskRetryPolicy) -> Self {
        Self::with_sleeper(call, policy, TokioSleeper)
    }
}

impl<C: Clock, S: Sleeper + Clone> BatchOrchestrator<C, S> {
    pub fn with_sleeper(call: ResilientCall<C>, policy: TaskRetryPolicy, sleeper: S) -> Self {
        Self { call, policy, sleeper, max_concurrency: 1 }
    }

    /// Allow up to `max_concurrency` items in flight; `0` is treated as `1`
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn call(&self) -> &ResilientCall<C> {
        &self.call
    }

    /// Run `job` over `item_ids`
    ///
    /// Never fails: per-item failures land in the result, and an expired
    /// budget or cancellation yields a partial result with the matching
    /// status.
    #[instrument(skip_all, fields(total_items = item_ids.len(), max_retries_per_item = max_retries_per_item))]
    pub async fn run_batch(
        &self,
        item_ids: &[String],
        job: &dyn JobFunction,
        max_retries_per_item: u32,
        options: RunOptions,
    ) -> BatchJobResult {
        let total = item_ids.len();
        let progress: Arc<dyn ProgressSink> = options.progress.unwrap_or_else(|| Arc::new(NoopProgress));
        let cancellation = options.cancellation.unwrap_or_default();
        let deadline = options.time_budget.map(|budget| Instant::now() + budget);
        let executor = self.executor(max_retries_per_item);

        info!(component = "batch_orchestrator", event = "batch_started", total, "Starting batch");
        progress.publish(BatchProgress::new(0, total, format!("Starting batch of {total} items")));

        let mut result = BatchJobResult::new(total);
        let mut status = BatchRunStatus::Completed;

        // Indexed so the stream closure borrows nothing per item and the
        // whole future stays Send inside task handlers
        let outcomes = stream::iter(0..total)
            .map(|index| {
                let attempts = Arc::new(AtomicU32::new(0));
                let work = self.process_item(&item_ids[index], job, &executor, max_retries_per_item, Arc::clone(&attempts));
                let guarded = guard(&cancellation, deadline, work);
                async move { (index, guarded.await, attempts) }
            })
            .buffered(self.max_concurrency);
        let mut outcomes = std::pin::pin!(outcomes);

        while let Some((index, guarded, attempts)) = outcomes.next().await {
            let item_id = &item_ids[index];
            let outcome = match guarded {
                Guarded::Finished(outcome) => outcome,
                Guarded::Cancelled => {
                    status = BatchRunStatus::Cancelled;
                    ItemOutcome::failed(
                        item_id.as_str(),
                        TaskError::cancelled(format!("Item {item_id} was cancelled")),
                        attempts.load(Ordering::Relaxed),
                    )
                }
                Guarded::TimedOut => {
                    status = BatchRunStatus::Timeout;
                    warn!(
                        component = "batch_orchestrator",
                        event = "time_budget_exceeded",
                        processed = result.total_processed(),
                        total,
                        "Batch time budget exceeded, returning partial result"
                    );
                    break;
                }
            };

            let message = format!("Item {item_id}: {}", outcome.status);
            result.record(outcome);
            progress.publish(BatchProgress::new(result.total_processed(), total, message));
        }

        info!(
            component = "batch_orchestrator",
            event = "batch_finished",
            status = %status,
            total_processed = result.total_processed(),
            successful = result.successful(),
            failed = result.failed(),
            "Batch finished"
        );
        result.finish(status)
    }

    /// Run a single long-running job with the same retry, budget and
    /// cancellation handling as a batch item
    #[instrument(skip_all, fields(max_retries = max_retries))]
    pub async fn run_long_job(
        &self,
        job: &dyn LongRunningJob,
        config: &Value,
        max_retries: u32,
        options: RunOptions,
    ) -> ItemOutcome {
        let progress: Arc<dyn ProgressSink> = options.progress.unwrap_or_else(|| Arc::new(NoopProgress));
        let cancellation = options.cancellation.unwrap_or_default();
        let deadline = options.time_budget.map(|budget| Instant::now() + budget);
        let executor = self.executor(max_retries);
        let context = item_context(LONG_RUNNING_ITEM_ID);
        let attempts = AtomicU32::new(0);

        progress.publish(BatchProgress::new(0, 1, "Starting long-running job"));
        let work = async {
            let (result, made) =
                self.run_with_retries(&executor, max_retries, &context, &attempts, || job.run(config)).await;
            into_outcome(LONG_RUNNING_ITEM_ID, result, made)
        };

        let outcome = match guard(&cancellation, deadline, work).await {
            Guarded::Finished(outcome) => outcome,
            Guarded::Cancelled => ItemOutcome::failed(
                LONG_RUNNING_ITEM_ID,
                TaskError::cancelled("Long-running job was cancelled"),
                attempts.load(Ordering::Relaxed),
            ),
            Guarded::TimedOut => ItemOutcome::failed(
                LONG_RUNNING_ITEM_ID,
                TaskError::new(TaskErrorCode::ResourceTimeout, "Long-running job exceeded its time budget"),
                attempts.load(Ordering::Relaxed),
            ),
        };
        progress.publish(BatchProgress::new(1, 1, format!("Long-running job {}", outcome.status)));
        outcome
    }

    async fn process_item(
        &self,
        item_id: &str,
        job: &dyn JobFunction,
        executor: &TaskRetryExecutor<S>,
        max_retries: u32,
        attempts: Arc<AtomicU32>,
    ) -> ItemOutcome {
        let context = item_context(item_id);
        let (result, made) =
            self.run_with_retries(executor, max_retries, &context, &attempts, || job.run(item_id)).await;
        into_outcome(item_id, result, made)
    }

    /// Attempt `operation` through the resilient call until it succeeds or
    /// the policy gives up
    ///
    /// `attempts` is bumped as each attempt starts so an interrupted run
    /// can still report the work it did.
    async fn run_with_retries<F, Fut>(
        &self,
        executor: &TaskRetryExecutor<S>,
        max_retries: u32,
        context: &BTreeMap<String, Value>,
        attempts: &AtomicU32,
        mut operation: F,
    ) -> (Result<Value, TaskError>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, JobError>>,
    {
        let mut retry_count: u32 = 0;
        let outcome = executor
            .execute_with_outcome(|| {
                let attempt_retry_count = retry_count;
                retry_count += 1;
                attempts.store(retry_count, Ordering::Relaxed);
                let attempt = operation();
                async move {
                    self.call
                        .call_with_context(context, || attempt)
                        .await
                        .map_err(|err| err.with_max_retries(max_retries).with_retry_count(attempt_retry_count))
                }
            })
            .await;

        let made = outcome.attempts;
        let result = outcome.result.map_err(|err| {
            err.into_last_error().unwrap_or_else(|| {
                TaskError::new(TaskErrorCode::UnknownError, "Retry loop ended without an error")
            })
        });
        (result, made)
    }

    fn executor(&self, max_retries: u32) -> TaskRetryExecutor<S> {
        RetryExecutor::with_sleeper(
            RetryConfig::with_max_retries(max_retries),
            self.policy.clone(),
            self.sleeper.clone(),
        )
    }
}

fn item_context(item_id: &str) -> BTreeMap<String, Value> {
    let mut context = BTreeMap::new();
    context.insert("item_id".to_string(), Value::from(item_id));
    context
}

fn into_outcome(item_id: &str, result: Result<Value, TaskError>, attempts: u32) -> ItemOutcome {
    match result {
        Ok(value) => {
            debug!(component = "batch_orchestrator", event = "item_succeeded", item_id, attempts, "Item succeeded");
            ItemOutcome::success(item_id, value, attempts)
        }
        Err(error) => {
            warn!(
                component = "batch_orchestrator",
                event = "item_failed",
                item_id,
                attempts,
                code = %error.code(),
                error = %error,
                "Item failed"
            );
            ItemOutcome::failed(item_id, error, attempts)
        }
    }
}

/// Race `work` against cancellation and the deadline, cancellation first
async fn guard<F>(cancellation: &CancellationToken, deadline: Option<Instant>, work: F) -> Guarded
where
    F: Future<Output = ItemOutcome>,
{
    let expiry = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        () = cancellation.cancelled() => Guarded::Cancelled,
        () = expiry => Guarded::TimedOut,
        outcome = work => Guarded::Finished(outcome),
    }
}
