//! In-process task runtime
//!
//! Submissions land in a priority queue (higher priority first, FIFO within
//! a priority). `worker_concurrency` tokio workers drain it. Tasks with an
//! eta wait on a timer and are counted as scheduled until it fires.
//!
//! Revoking a waiting task removes it from consideration. Revoking a running
//! task with `terminate` cancels its [`CancellationToken`]; a handler that
//! does not wind down within the revoke grace period is dropped. The hard
//! time limit is enforced here, while the soft limit is handed to handlers
//! so they can return partial results first.
//!
//! Finished task records are kept for `result_retention` and then dropped by
//! a periodic sweep, after which their ids report `PENDING` like any other
//! unknown id.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use jobwarden_core::batch::ProgressSink;
use jobwarden_core::{TaskContext, TaskHandler, TaskRuntime};
use jobwarden_domain::{
    BatchConfig, BatchProgress, Result, TaskInfo, TaskPriority, TaskState,
    TaskStatusReport, TaskSubmission,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::error::{RuntimeError, RuntimeResult};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Worker pool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub worker_concurrency: usize,
    /// Passed to handlers as their wrap-up budget
    pub soft_time_limit: Option<Duration>,
    /// Tasks still running after this are cancelled and marked failed
    pub hard_time_limit: Option<Duration>,
    /// How long a terminated handler may take to return after cancellation
    pub revoke_grace: Duration,
    /// Finished records older than this are dropped by cleanup
    pub result_retention: Duration,
    /// Period of the background cleanup sweep
    pub cleanup_interval: Duration,
    pub worker_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_batch_config(&BatchConfig::default())
    }
}

impl RuntimeConfig {
    pub fn from_batch_config(batch: &BatchConfig) -> Self {
        Self {
            worker_concurrency: batch.worker_concurrency.max(1),
            soft_time_limit: Some(batch.soft_time_limit()),
            hard_time_limit: Some(batch.hard_time_limit()),
            revoke_grace: Duration::from_secs(5),
            result_retention: batch.result_retention(),
            cleanup_interval: CLEANUP_INTERVAL,
            worker_name: "jobwarden@local".to_string(),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Task bookkeeping */
/* -------------------------------------------------------------------------- */

struct TaskRecord {
    name: String,
    queue: String,
    state: TaskState,
    /// Waiting for its eta rather than in the ready queue
    scheduled: bool,
    payload: Option<Value>,
    worker: Option<String>,
    started_at: Option<DateTime<Utc>>,
    progress: Option<BatchProgress>,
    result: Option<Value>,
    error: Option<String>,
    /// When the record reached a terminal state
    finished_at: Option<DateTime<Utc>>,
    cancellation: CancellationToken,
}

impl TaskRecord {
    fn is_waiting(&self) -> bool {
        self.state == TaskState::Pending && !self.scheduled
    }

    fn revoke(&mut self, reason: impl Into<String>) {
        // A running task finishes once its handler winds down
        if self.state == TaskState::Pending {
            self.finished_at = Some(Utc::now());
        }
        self.state = TaskState::Revoked;
        self.error = Some(reason.into());
        self.payload = None;
        self.cancellation.cancel();
    }

    fn report(&self, task_id: &str) -> TaskStatusReport {
        TaskStatusReport {
            task_id: task_id.to_string(),
            status: self.state,
            progress: self.progress.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }

    fn info(&self, task_id: &str) -> TaskInfo {
        TaskInfo {
            task_id: task_id.to_string(),
            name: self.name.clone(),
            queue: self.queue.clone(),
            status: self.state,
            worker: self.worker.clone(),
            started_at: self.started_at,
            progress: self.progress.clone(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct QueuedTask {
    priority: TaskPriority,
    sequence: u64,
    task_id: String,
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority).then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

enum Finished {
    Done(Result<Value>),
    HardLimit(Duration),
    Abandoned,
}

struct Shared {
    config: RuntimeConfig,
    handlers: DashMap<String, Arc<dyn TaskHandler>>,
    tasks: DashMap<String, TaskRecord>,
    ready: Mutex<BinaryHeap<QueuedTask>>,
    notify: Notify,
    sequence: AtomicU64,
}

impl Shared {
    fn enqueue(&self, task_id: String, priority: TaskPriority) {
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::SeqCst);
        self.ready.lock().push(QueuedTask { priority, sequence, task_id });
        self.notify.notify_one();
    }

    async fn worker_loop(self: Arc<Self>, worker_name: String, shutdown: CancellationToken) {
        debug!(component = "task_runtime", event = "worker_started", worker = %worker_name, "Worker started");
        while !shutdown.is_cancelled() {
            let next = self.ready.lock().pop();
            match next {
                Some(entry) => self.execute(&entry.task_id, &worker_name).await,
                None => {
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        () = self.notify.notified() => {}
                    }
                }
            }
        }
        debug!(component = "task_runtime", event = "worker_stopped", worker = %worker_name, "Worker stopped");
    }

    async fn execute(self: &Arc<Self>, task_id: &str, worker_name: &str) {
        let Some((handler, payload, context)) = self.claim(task_id, worker_name) else {
            return;
        };

        info!(
            component = "task_runtime",
            event = "task_started",
            task_id,
            task = %handler.name(),
            worker = %worker_name,
            "Task started"
        );

        let token = context.cancellation.clone();
        let hard_limit = self.config.hard_time_limit;
        let grace = self.config.revoke_grace;
        let work = handler.handle(payload, context);

        let finished = tokio::select! {
            finished = async {
                match hard_limit {
                    Some(limit) => match tokio::time::timeout(limit, work).await {
                        Ok(result) => Finished::Done(result),
                        Err(_) => Finished::HardLimit(limit),
                    },
                    None => Finished::Done(work.await),
                }
            } => finished,
            () = async {
                token.cancelled().await;
                tokio::time::sleep(grace).await;
            } => Finished::Abandoned,
        };

        self.finalize(task_id, finished);
    }

    /// Move a waiting task to PROGRESS and build its execution context
    fn claim(
        self: &Arc<Self>,
        task_id: &str,
        worker_name: &str,
    ) -> Option<(Arc<dyn TaskHandler>, Value, TaskContext)> {
        let mut record = self.tasks.get_mut(task_id)?;
        if record.state != TaskState::Pending {
            return None;
        }

        let Some(handler) = self.handlers.get(&record.name).map(|entry| Arc::clone(entry.value())) else {
            let error = RuntimeError::UnknownHandler { name: record.name.clone() };
            record.state = TaskState::Failure;
            record.error = Some(error.to_string());
            record.finished_at = Some(Utc::now());
            return None;
        };

        record.state = TaskState::Progress;
        record.started_at = Some(Utc::now());
        record.worker = Some(worker_name.to_string());
        let payload = record.payload.take().unwrap_or(Value::Null);

        let context = TaskContext {
            task_id: task_id.to_string(),
            progress: Arc::new(RecordProgress { shared: Arc::clone(self), task_id: task_id.to_string() }),
            cancellation: record.cancellation.clone(),
            soft_time_limit: self.config.soft_time_limit,
        };
        Some((handler, payload, context))
    }

    fn finalize(&self, task_id: &str, finished: Finished) {
        let Some(mut record) = self.tasks.get_mut(task_id) else {
            return;
        };
        record.finished_at = Some(Utc::now());

        if record.state == TaskState::Revoked {
            if let Finished::Done(Ok(value)) = finished {
                record.result = Some(value);
            }
            info!(component = "task_runtime", event = "task_revoked", task_id, "Revoked task wound down");
            return;
        }

        match finished {
            Finished::Done(Ok(value)) => {
                record.state = TaskState::Success;
                record.result = Some(value);
                info!(component = "task_runtime", event = "task_succeeded", task_id, "Task succeeded");
            }
            Finished::Done(Err(err)) => {
                record.state = TaskState::Failure;
                record.error = Some(err.to_string());
                warn!(component = "task_runtime", event = "task_failed", task_id, error = %err, "Task failed");
            }
            Finished::HardLimit(limit) => {
                record.cancellation.cancel();
                record.state = TaskState::Failure;
                record.error = Some(format!("Task exceeded hard time limit of {}s", limit.as_secs()));
                warn!(
                    component = "task_runtime",
                    event = "hard_time_limit_exceeded",
                    task_id,
                    limit_secs = limit.as_secs(),
                    "Task killed at hard time limit"
                );
            }
            Finished::Abandoned => {
                record.state = TaskState::Revoked;
                warn!(component = "task_runtime", event = "task_abandoned", task_id, "Task ignored cancellation and was dropped");
            }
        }
    }

    /// Drop finished records older than the retention window
    fn cleanup_expired(&self) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(self.config.result_retention)
            .ok()
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
        else {
            return 0;
        };

        let mut removed = 0;
        self.tasks.retain(|_, record| {
            let expired = record.finished_at.is_some_and(|finished| finished <= cutoff);
            if expired {
                removed += 1;
            }
            !expired
        });

        if removed > 0 {
            info!(component = "task_runtime", event = "expired_tasks_cleaned", removed, "Expired task records dropped");
        }
        removed
    }

    async fn cleanup_loop(self: Arc<Self>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.config.cleanup_interval) => {
                    self.cleanup_expired();
                }
            }
        }
    }
}

/// Writes handler progress into the task record
struct RecordProgress {
    shared: Arc<Shared>,
    task_id: String,
}

impl ProgressSink for RecordProgress {
    fn publish(&self, progress: BatchProgress) {
        if let Some(mut record) = self.shared.tasks.get_mut(&self.task_id) {
            record.progress = Some(progress);
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Runtime */
/* -------------------------------------------------------------------------- */

/// [`TaskRuntime`] backed by an in-process worker pool
pub struct InMemoryTaskRuntime {
    shared: Arc<Shared>,
    shutdown: Mutex<CancellationToken>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl InMemoryTaskRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                handlers: DashMap::new(),
                tasks: DashMap::new(),
                ready: Mutex::new(BinaryHeap::new()),
                notify: Notify::new(),
                sequence: AtomicU64::new(0),
            }),
            shutdown: Mutex::new(CancellationToken::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Register a handler under its task name, replacing any previous one
    pub fn register_handler(&self, handler: Arc<dyn TaskHandler>) {
        let name = handler.name().to_string();
        info!(component = "task_runtime", event = "handler_registered", task = %name, "Task handler registered");
        self.shared.handlers.insert(name, handler);
    }

    /// Spawn the worker pool
    ///
    /// # Errors
    ///
    /// Returns error if workers are already running
    #[instrument(skip(self))]
    pub fn start(&self) -> RuntimeResult<()> {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return Err(RuntimeError::AlreadyRunning);
        }

        // Fresh token so the runtime can be restarted after shutdown
        let token = CancellationToken::new();
        *self.shutdown.lock() = token.clone();

        for index in 0..self.shared.config.worker_concurrency {
            let worker_name = format!("{}-{index}", self.shared.config.worker_name);
            let shared = Arc::clone(&self.shared);
            workers.push(tokio::spawn(shared.worker_loop(worker_name, token.clone())));
        }
        workers.push(tokio::spawn(Arc::clone(&self.shared).cleanup_loop(token)));

        info!(
            component = "task_runtime",
            event = "started",
            workers = self.shared.config.worker_concurrency,
            "Task runtime started"
        );
        Ok(())
    }

    /// Stop the workers after their current task
    ///
    /// # Errors
    ///
    /// Returns error if the runtime is not running or a worker does not stop
    /// in time
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> RuntimeResult<()> {
        let handles = std::mem::take(&mut *self.workers.lock());
        if handles.is_empty() {
            return Err(RuntimeError::NotRunning);
        }

        self.shutdown.lock().cancel();

        let joined = tokio::time::timeout(SHUTDOWN_TIMEOUT, futures_join(handles)).await;
        if joined.is_err() {
            warn!(component = "task_runtime", event = "shutdown_timeout", "Workers did not stop in time");
            return Err(RuntimeError::ShutdownTimeout { seconds: SHUTDOWN_TIMEOUT.as_secs() });
        }

        info!(component = "task_runtime", event = "stopped", "Task runtime stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.workers.lock().is_empty()
    }

    /// Drop finished task records older than `result_retention`, returning
    /// how many were removed
    ///
    /// Runs periodically while the workers are up; callers may also invoke
    /// it directly.
    pub fn cleanup_expired(&self) -> usize {
        self.shared.cleanup_expired()
    }
}

async fn futures_join(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(err) = handle.await {
            warn!(component = "task_runtime", event = "worker_join_failed", error = %err, "Worker task ended abnormally");
        }
    }
}

#[async_trait]
impl TaskRuntime for InMemoryTaskRuntime {
    #[instrument(skip(self, submission), fields(task = %submission.name, queue = %submission.queue))]
    async fn submit(&self, submission: TaskSubmission) -> Result<String> {
        if !self.shared.handlers.contains_key(&submission.name) {
            return Err(RuntimeError::UnknownHandler { name: submission.name }.into());
        }

        let task_id = Uuid::new_v4().to_string();
        let delay = submission
            .eta
            .and_then(|eta| (eta - Utc::now()).to_std().ok())
            .filter(|delay| !delay.is_zero());
        let cancellation = CancellationToken::new();

        self.shared.tasks.insert(
            task_id.clone(),
            TaskRecord {
                name: submission.name,
                queue: submission.queue,
                state: TaskState::Pending,
                scheduled: delay.is_some(),
                payload: Some(submission.payload),
                worker: None,
                started_at: None,
                progress: None,
                result: None,
                error: None,
                finished_at: None,
                cancellation: cancellation.clone(),
            },
        );

        match delay {
            None => self.shared.enqueue(task_id.clone(), submission.priority),
            Some(delay) => {
                let shared = Arc::clone(&self.shared);
                let scheduled_id = task_id.clone();
                let priority = submission.priority;
                tokio::spawn(async move {
                    tokio::select! {
                        () = cancellation.cancelled() => {}
                        () = tokio::time::sleep(delay) => {
                            let due = match shared.tasks.get_mut(&scheduled_id) {
                                Some(mut record) if record.state == TaskState::Pending => {
                                    record.scheduled = false;
                                    true
                                }
                                _ => false,
                            };
                            if due {
                                shared.enqueue(scheduled_id, priority);
                            }
                        }
                    }
                });
            }
        }

        info!(component = "task_runtime", event = "task_submitted", task_id = %task_id, "Task submitted");
        Ok(task_id)
    }

    async fn status(&self, task_id: &str) -> Result<TaskStatusReport> {
        Ok(self
            .shared
            .tasks
            .get(task_id)
            .map_or_else(|| TaskStatusReport::pending(task_id), |record| record.report(task_id)))
    }

    async fn active_tasks(&self) -> Result<Vec<TaskInfo>> {
        Ok(self
            .shared
            .tasks
            .iter()
            .filter(|entry| entry.state == TaskState::Progress)
            .map(|entry| entry.info(entry.key()))
            .collect())
    }

    async fn task_info(&self, task_id: &str) -> Result<Option<TaskInfo>> {
        Ok(self.shared.tasks.get(task_id).map(|record| record.info(task_id)))
    }

    #[instrument(skip(self))]
    async fn revoke(&self, task_id: &str, terminate: bool) -> Result<bool> {
        let Some(mut record) = self.shared.tasks.get_mut(task_id) else {
            return Ok(false);
        };

        let queued = record.is_waiting();
        let revoked = match record.state {
            TaskState::Pending => {
                record.revoke("Revoked before execution");
                true
            }
            TaskState::Progress | TaskState::Retry if terminate => {
                record.revoke("Terminated by revoke");
                true
            }
            TaskState::Progress | TaskState::Retry => {
                debug!(component = "task_runtime", event = "revoke_skipped", task_id, "Running task left to finish");
                false
            }
            TaskState::Success | TaskState::Failure | TaskState::Revoked => false,
        };
        drop(record);

        if revoked && queued {
            self.shared.ready.lock().retain(|entry| entry.task_id != task_id);
        }
        if revoked {
            info!(component = "task_runtime", event = "task_revoked", task_id, terminate, "Task revoked");
        }
        Ok(revoked)
    }

    async fn queue_length(&self, queue: &str) -> Result<usize> {
        Ok(self.shared.tasks.iter().filter(|entry| entry.queue == queue && entry.is_waiting()).count())
    }

    async fn scheduled_count(&self, queue: &str) -> Result<usize> {
        Ok(self
            .shared
            .tasks
            .iter()
            .filter(|entry| entry.queue == queue && entry.state == TaskState::Pending && entry.scheduled)
            .count())
    }

    #[instrument(skip(self))]
    async fn purge(&self, queue: &str) -> Result<usize> {
        let mut purged = Vec::new();
        for mut entry in self.shared.tasks.iter_mut() {
            if entry.queue == queue && entry.is_waiting() {
                entry.revoke(format!("Purged from queue '{queue}'"));
                purged.push(entry.key().clone());
            }
        }

        if !purged.is_empty() {
            self.shared.ready.lock().retain(|queued| !purged.contains(&queued.task_id));
        }

        info!(component = "task_runtime", event = "queue_purged", queue, purged = purged.len(), "Queue purged");
        Ok(purged.len())
    }
}

#[cfg(test)]
mod tests {
    use jobwarden_domain::JobwardenError;
    use serde_json::json;

    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl TaskHandler for EchoHandler {
        fn name(&self) -> &str {
            "echo"
        }

        async fn handle(&self, payload: Value, _context: TaskContext) -> Result<Value> {
            Ok(payload)
        }
    }

    fn runtime() -> InMemoryTaskRuntime {
        let runtime = InMemoryTaskRuntime::new(RuntimeConfig::default());
        runtime.register_handler(Arc::new(EchoHandler));
        runtime
    }

    /* ---------------------------------------------------------------------- */
    /* Queue ordering */
    /* ---------------------------------------------------------------------- */

    /// Validates ready-queue ordering.
    ///
    /// Assertions:
    /// - Higher priority pops first.
    /// - Equal priorities pop in submission order.
    #[test]
    fn test_queued_task_ordering() {
        let mut heap = BinaryHeap::new();
        heap.push(QueuedTask { priority: TaskPriority::Normal, sequence: 0, task_id: "n0".into() });
        heap.push(QueuedTask { priority: TaskPriority::Low, sequence: 1, task_id: "l1".into() });
        heap.push(QueuedTask { priority: TaskPriority::Critical, sequence: 2, task_id: "c2".into() });
        heap.push(QueuedTask { priority: TaskPriority::Normal, sequence: 3, task_id: "n3".into() });

        let order: Vec<String> = std::iter::from_fn(|| heap.pop().map(|t| t.task_id)).collect();
        assert_eq!(order, vec!["c2", "n0", "n3", "l1"]);
    }

    #[test]
    fn test_config_from_batch_settings() {
        let config = RuntimeConfig::default();
        assert_eq!(config.worker_concurrency, 4);
        assert_eq!(config.soft_time_limit, Some(Duration::from_secs(3300)));
        assert_eq!(config.hard_time_limit, Some(Duration::from_secs(3600)));
        assert_eq!(config.result_retention, Duration::from_secs(3600));
    }

    /* ---------------------------------------------------------------------- */
    /* Submission without workers */
    /* ---------------------------------------------------------------------- */

    /// Validates submission bookkeeping while no workers run.
    ///
    /// Assertions:
    /// - Unknown task names are rejected as invalid input.
    /// - Submitted tasks stay PENDING and count toward their queue.
    /// - Ids the runtime never issued report PENDING.
    #[tokio::test]
    async fn test_submit_and_status() {
        let runtime = runtime();

        let err = runtime.submit(TaskSubmission::new("missing", "default", json!({}))).await.unwrap_err();
        assert!(matches!(err, JobwardenError::InvalidInput(_)));

        let id = runtime.submit(TaskSubmission::new("echo", "batch", json!({"n": 1}))).await.unwrap();
        assert_eq!(runtime.status(&id).await.unwrap().status, TaskState::Pending);
        assert_eq!(runtime.queue_length("batch").await.unwrap(), 1);
        assert_eq!(runtime.queue_length("default").await.unwrap(), 0);
        assert!(runtime.task_info(&id).await.unwrap().is_some());

        let unknown = runtime.status("nope").await.unwrap();
        assert_eq!(unknown.status, TaskState::Pending);
        assert!(runtime.task_info("nope").await.unwrap().is_none());
    }

    /// Validates revoke and purge of waiting tasks.
    ///
    /// Assertions:
    /// - Revoking a waiting task succeeds once and records the reason.
    /// - Purge revokes only waiting tasks in the named queue.
    #[tokio::test]
    async fn test_revoke_and_purge_waiting() {
        let runtime = runtime();
        let first = runtime.submit(TaskSubmission::new("echo", "batch", json!(1))).await.unwrap();
        let second = runtime.submit(TaskSubmission::new("echo", "batch", json!(2))).await.unwrap();
        let other = runtime.submit(TaskSubmission::new("echo", "default", json!(3))).await.unwrap();

        assert!(runtime.revoke(&first, false).await.unwrap());
        assert!(!runtime.revoke(&first, true).await.unwrap());
        let report = runtime.status(&first).await.unwrap();
        assert_eq!(report.status, TaskState::Revoked);
        assert_eq!(report.error.as_deref(), Some("Revoked before execution"));

        assert_eq!(runtime.purge("batch").await.unwrap(), 1);
        assert_eq!(runtime.status(&second).await.unwrap().status, TaskState::Revoked);
        assert_eq!(runtime.status(&other).await.unwrap().status, TaskState::Pending);
        assert_eq!(runtime.queue_length("batch").await.unwrap(), 0);
        assert_eq!(runtime.shared.ready.lock().len(), 1);
    }

    /// Validates that revoking a waiting task also dequeues it.
    ///
    /// Assertions:
    /// - Only the untouched task remains in the ready queue.
    #[tokio::test]
    async fn test_revoke_removes_ready_entry() {
        let runtime = runtime();
        let revoked = runtime.submit(TaskSubmission::new("echo", "batch", json!(1))).await.unwrap();
        let kept = runtime.submit(TaskSubmission::new("echo", "batch", json!(2))).await.unwrap();

        assert!(runtime.revoke(&revoked, false).await.unwrap());

        let ready: Vec<String> = runtime.shared.ready.lock().iter().map(|entry| entry.task_id.clone()).collect();
        assert_eq!(ready, vec![kept]);
    }

    /* ---------------------------------------------------------------------- */
    /* Record retention */
    /* ---------------------------------------------------------------------- */

    /// Validates cleanup of finished records.
    ///
    /// Assertions:
    /// - With zero retention a revoked task is dropped and then reports PENDING.
    /// - A task that never finished is kept.
    #[tokio::test]
    async fn test_cleanup_drops_expired_records() {
        let runtime =
            InMemoryTaskRuntime::new(RuntimeConfig { result_retention: Duration::ZERO, ..RuntimeConfig::default() });
        runtime.register_handler(Arc::new(EchoHandler));
        let revoked = runtime.submit(TaskSubmission::new("echo", "batch", json!(1))).await.unwrap();
        let waiting = runtime.submit(TaskSubmission::new("echo", "batch", json!(2))).await.unwrap();
        assert!(runtime.revoke(&revoked, false).await.unwrap());

        assert_eq!(runtime.cleanup_expired(), 1);
        assert!(runtime.task_info(&revoked).await.unwrap().is_none());
        assert_eq!(runtime.status(&revoked).await.unwrap().status, TaskState::Pending);
        assert!(runtime.task_info(&waiting).await.unwrap().is_some());
        assert_eq!(runtime.cleanup_expired(), 0);
    }

    /// Validates that records inside the retention window survive cleanup.
    #[tokio::test]
    async fn test_cleanup_keeps_recent_records() {
        let runtime = runtime();
        let revoked = runtime.submit(TaskSubmission::new("echo", "batch", json!(1))).await.unwrap();
        assert!(runtime.revoke(&revoked, false).await.unwrap());

        assert_eq!(runtime.cleanup_expired(), 0);
        assert_eq!(runtime.status(&revoked).await.unwrap().status, TaskState::Revoked);
    }

    /// Validates the worker lifecycle guards.
    ///
    /// Assertions:
    /// - Starting twice fails.
    /// - Shutting down twice fails.
    #[tokio::test]
    async fn test_start_and_shutdown_guards() {
        let runtime = runtime();
        runtime.start().unwrap();
        assert!(runtime.is_running());
        assert!(matches!(runtime.start(), Err(RuntimeError::AlreadyRunning)));

        runtime.shutdown().await.unwrap();
        assert!(!runtime.is_running());
        assert!(matches!(runtime.shutdown().await, Err(RuntimeError::NotRunning)));
    }
}
