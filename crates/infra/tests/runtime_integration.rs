//! Integration tests for the in-process task runtime
//!
//! Drives real batch handlers through worker tasks and checks the status,
//! revoke, scheduling and time-limit behaviour seen by callers.

mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jobwarden_common::testing::poll_until;
use jobwarden_core::{
    BatchService, BatchTaskHandler, ProgressSink, QueueMonitor, TaskContext, TaskHandler, TaskRuntime,
};
use jobwarden_domain::constants::QUEUE_BATCH;
use jobwarden_domain::{BatchProgress, JobwardenError, Result, TaskPriority, TaskState, TaskSubmission};
use jobwarden_infra::{InMemoryTaskRuntime, RuntimeConfig};
use serde_json::{json, Value};
use support::{ids, orchestrator, runtime_config, wait_for_state, wait_for_terminal, LookupJob};
use tokio::sync::Notify;

/* -------------------------------------------------------------------------- */
/* Test handlers */
/* -------------------------------------------------------------------------- */

/// Records the payload of every task it runs, optionally waiting on a gate
struct RecordingHandler {
    name: &'static str,
    gate: Option<Arc<Notify>>,
    seen: Arc<Mutex<Vec<Value>>>,
}

impl RecordingHandler {
    fn new(name: &'static str) -> Self {
        Self { name, gate: None, seen: Arc::new(Mutex::new(Vec::new())) }
    }

    fn gated(name: &'static str, gate: Arc<Notify>) -> Self {
        Self { gate: Some(gate), ..Self::new(name) }
    }
}

#[async_trait]
impl TaskHandler for RecordingHandler {
    fn name(&self) -> &str {
        self.name
    }

    async fn handle(&self, payload: Value, _context: TaskContext) -> Result<Value> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.seen.lock().unwrap().push(payload.clone());
        Ok(payload)
    }
}

/// Publishes progress, then runs until cancelled or the sleep elapses
struct SlowHandler {
    sleep: Duration,
}

#[async_trait]
impl TaskHandler for SlowHandler {
    fn name(&self) -> &str {
        "slow"
    }

    async fn handle(&self, _payload: Value, context: TaskContext) -> Result<Value> {
        context.progress.publish(BatchProgress::new(1, 4, "Processing item 1 of 4"));
        tokio::select! {
            () = context.cancellation.cancelled() => Ok(json!({ "stopped": true })),
            () = tokio::time::sleep(self.sleep) => Ok(json!({ "stopped": false })),
        }
    }
}

/// Ignores cancellation entirely
struct StubbornHandler;

#[async_trait]
impl TaskHandler for StubbornHandler {
    fn name(&self) -> &str {
        "stubborn"
    }

    async fn handle(&self, _payload: Value, _context: TaskContext) -> Result<Value> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Value::Null)
    }
}

struct FailingHandler;

#[async_trait]
impl TaskHandler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    async fn handle(&self, _payload: Value, _context: TaskContext) -> Result<Value> {
        Err(JobwardenError::Dependency("model provider returned garbage".into()))
    }
}

fn batch_runtime(workers: usize) -> Arc<InMemoryTaskRuntime> {
    let runtime = InMemoryTaskRuntime::new(runtime_config(workers));
    runtime.register_handler(Arc::new(BatchTaskHandler::new(orchestrator(5, 2), Arc::new(LookupJob))));
    Arc::new(runtime)
}

/* -------------------------------------------------------------------------- */
/* Batch execution */
/* -------------------------------------------------------------------------- */

/// Validates a batch submitted through the service end to end.
///
/// Assertions:
/// - The task reaches SUCCESS.
/// - The stored result lists every item in order with per-item outcomes.
/// - Final progress reports every item processed.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_runs_to_success() {
    let runtime = batch_runtime(2);
    runtime.start().unwrap();
    let service = BatchService::new(runtime.clone(), 3);

    let job = service
        .submit_batch(ids(&["a", "missing-1", "c"]), None, TaskPriority::Normal, Some("ops".into()))
        .await
        .unwrap();

    let report = wait_for_terminal(&runtime, &job.task_id).await;
    assert_eq!(report.status, TaskState::Success);
    assert_eq!(report.progress.as_ref().map(|p| (p.current, p.total)), Some((3, 3)));

    let result = service.get_batch_results(&job.task_id).await.unwrap().expect("results after success");
    assert_eq!(result["status"], "completed");
    assert_eq!(result["total_processed"], 3);
    assert_eq!(result["successful"], 2);
    assert_eq!(result["failed"], 1);
    assert_eq!(result["results"][0]["result"]["item"], "A");
    assert_eq!(result["results"][1]["error"]["code"], "ENTITY_NOT_FOUND");
    assert_eq!(result["results"][1]["attempts"], 1);

    let status = service.get_batch_status(&job.task_id).await.unwrap();
    assert_eq!(status.progress_percentage, Some(100.0));

    runtime.shutdown().await.unwrap();
}

/// Validates that a failing handler surfaces as FAILURE with its message.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_handler_error_marks_failure() {
    let runtime = InMemoryTaskRuntime::new(runtime_config(1));
    runtime.register_handler(Arc::new(FailingHandler));
    runtime.start().unwrap();

    let id = runtime.submit(TaskSubmission::new("failing", "default", json!({}))).await.unwrap();
    let report = wait_for_terminal(&runtime, &id).await;

    assert_eq!(report.status, TaskState::Failure);
    assert!(report.error.unwrap().contains("model provider returned garbage"));
    runtime.shutdown().await.unwrap();
}

/* -------------------------------------------------------------------------- */
/* Ordering and scheduling */
/* -------------------------------------------------------------------------- */

/// Validates priority ordering with a single worker.
///
/// Assertions:
/// - While the worker is busy, later submissions wait in the queue.
/// - Once free, the worker takes the critical task before normal and low
///   ones, and equal priorities in submission order.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_priority_order_single_worker() {
    let gate = Arc::new(Notify::new());
    let blocker = RecordingHandler::gated("blocker", gate.clone());
    let recorder = RecordingHandler::new("record");
    let seen = recorder.seen.clone();

    let runtime = InMemoryTaskRuntime::new(runtime_config(1));
    runtime.register_handler(Arc::new(blocker));
    runtime.register_handler(Arc::new(recorder));
    runtime.start().unwrap();

    let blocking = runtime.submit(TaskSubmission::new("blocker", "default", json!("block"))).await.unwrap();
    wait_for_state(&runtime, &blocking, TaskState::Progress).await;

    let submit = |payload: &'static str, priority| {
        runtime.submit(TaskSubmission::new("record", "default", json!(payload)).with_priority(priority))
    };
    submit("low", TaskPriority::Low).await.unwrap();
    submit("normal-1", TaskPriority::Normal).await.unwrap();
    let last = submit("critical", TaskPriority::Critical).await.unwrap();
    submit("normal-2", TaskPriority::Normal).await.unwrap();
    assert_eq!(runtime.queue_length("default").await.unwrap(), 4);
    assert_eq!(runtime.active_tasks().await.unwrap().len(), 1);

    gate.notify_one();
    let report = wait_for_terminal(&runtime, &last).await;
    assert_eq!(report.status, TaskState::Success);

    let all_done = poll_until(Duration::from_secs(5), Duration::from_millis(10), || async {
        seen.lock().unwrap().len() == 4
    })
    .await;
    assert!(all_done);
    assert_eq!(*seen.lock().unwrap(), vec![json!("critical"), json!("normal-1"), json!("normal-2"), json!("low")]);

    runtime.shutdown().await.unwrap();
}

/// Validates eta scheduling.
///
/// Assertions:
/// - A far-future task counts as scheduled, not queued.
/// - The queue monitor adds it to `total_pending`.
/// - A near-future task runs once its eta passes.
/// - Revoking a scheduled task takes it out of the count.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_eta_scheduling() {
    let runtime = Arc::new(InMemoryTaskRuntime::new(runtime_config(1)));
    runtime.register_handler(Arc::new(RecordingHandler::new("record")));
    runtime.start().unwrap();

    let later = runtime
        .submit(TaskSubmission::new("record", "default", json!(1)).with_eta(Utc::now() + chrono::Duration::hours(1)))
        .await
        .unwrap();
    assert_eq!(runtime.scheduled_count("default").await.unwrap(), 1);
    assert_eq!(runtime.queue_length("default").await.unwrap(), 0);

    let monitor = QueueMonitor::new(runtime.clone());
    let snapshot = monitor.get_queue_stats("default").await;
    assert_eq!(snapshot.scheduled_tasks, 1);
    assert_eq!(snapshot.total_pending, 1);

    let soon = runtime
        .submit(TaskSubmission::new("record", "default", json!(2)).with_eta(Utc::now() + chrono::Duration::milliseconds(50)))
        .await
        .unwrap();
    let report = wait_for_terminal(&runtime, &soon).await;
    assert_eq!(report.status, TaskState::Success);
    assert_eq!(report.result, Some(json!(2)));

    assert!(runtime.revoke(&later, false).await.unwrap());
    assert_eq!(runtime.scheduled_count("default").await.unwrap(), 0);
    assert_eq!(runtime.status(&later).await.unwrap().status, TaskState::Revoked);

    runtime.shutdown().await.unwrap();
}

/* -------------------------------------------------------------------------- */
/* Revoke and time limits */
/* -------------------------------------------------------------------------- */

/// Validates revoking a running task.
///
/// Assertions:
/// - Without `terminate` the running task is left alone.
/// - With `terminate` the task is marked REVOKED and its handler observes
///   cancellation; the partial result it returns is kept.
/// - Progress published by the handler is visible while it runs.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_revoke_running_task() {
    let runtime = InMemoryTaskRuntime::new(runtime_config(1));
    runtime.register_handler(Arc::new(SlowHandler { sleep: Duration::from_secs(60) }));
    runtime.start().unwrap();

    let id = runtime.submit(TaskSubmission::new("slow", QUEUE_BATCH, json!({}))).await.unwrap();
    wait_for_state(&runtime, &id, TaskState::Progress).await;

    let info = runtime.task_info(&id).await.unwrap().unwrap();
    assert!(info.worker.is_some());
    assert!(info.started_at.is_some());
    let published = poll_until(Duration::from_secs(5), Duration::from_millis(5), || async {
        runtime.status(&id).await.map(|r| r.progress.is_some()).unwrap_or(false)
    })
    .await;
    assert!(published);
    let running = runtime.status(&id).await.unwrap();
    assert_eq!(running.progress.map(|p| p.current), Some(1));

    assert!(!runtime.revoke(&id, false).await.unwrap());
    assert!(runtime.revoke(&id, true).await.unwrap());

    let stopped = poll_until(Duration::from_secs(5), Duration::from_millis(10), || async {
        runtime.status(&id).await.map(|r| r.result.is_some()).unwrap_or(false)
    })
    .await;
    assert!(stopped);
    let report = runtime.status(&id).await.unwrap();
    assert_eq!(report.status, TaskState::Revoked);
    assert_eq!(report.result, Some(json!({ "stopped": true })));

    runtime.shutdown().await.unwrap();
}

/// Validates that a handler ignoring cancellation is dropped after the
/// revoke grace period and frees its worker.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_terminate_drops_stubborn_handler() {
    let runtime = InMemoryTaskRuntime::new(runtime_config(1));
    runtime.register_handler(Arc::new(StubbornHandler));
    runtime.register_handler(Arc::new(RecordingHandler::new("record")));
    runtime.start().unwrap();

    let stubborn = runtime.submit(TaskSubmission::new("stubborn", "default", json!({}))).await.unwrap();
    wait_for_state(&runtime, &stubborn, TaskState::Progress).await;
    assert!(runtime.revoke(&stubborn, true).await.unwrap());

    let next = runtime.submit(TaskSubmission::new("record", "default", json!("after"))).await.unwrap();
    let report = wait_for_terminal(&runtime, &next).await;
    assert_eq!(report.status, TaskState::Success);
    assert_eq!(runtime.status(&stubborn).await.unwrap().status, TaskState::Revoked);

    runtime.shutdown().await.unwrap();
}

/// Validates the hard time limit.
///
/// Assertions:
/// - A task running past the limit is marked FAILURE with the limit in
///   its error message.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hard_time_limit_fails_task() {
    let config = RuntimeConfig { hard_time_limit: Some(Duration::from_millis(100)), ..runtime_config(1) };
    let runtime = InMemoryTaskRuntime::new(config);
    runtime.register_handler(Arc::new(StubbornHandler));
    runtime.start().unwrap();

    let id = runtime.submit(TaskSubmission::new("stubborn", "default", json!({}))).await.unwrap();
    let report = wait_for_terminal(&runtime, &id).await;

    assert_eq!(report.status, TaskState::Failure);
    assert!(report.error.unwrap().contains("hard time limit"));
    runtime.shutdown().await.unwrap();
}

/// Validates purging through the queue monitor.
///
/// Assertions:
/// - Only waiting tasks are purged; the running one finishes normally.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_purge_leaves_running_task() {
    let gate = Arc::new(Notify::new());
    let runtime = Arc::new(InMemoryTaskRuntime::new(runtime_config(1)));
    runtime.register_handler(Arc::new(RecordingHandler::gated("blocker", gate.clone())));
    runtime.start().unwrap();

    let running = runtime.submit(TaskSubmission::new("blocker", "default", json!(0))).await.unwrap();
    wait_for_state(&runtime, &running, TaskState::Progress).await;
    for n in 1..=3 {
        runtime.submit(TaskSubmission::new("blocker", "default", json!(n))).await.unwrap();
    }

    let monitor = QueueMonitor::new(runtime.clone());
    assert_eq!(monitor.purge_queue("default").await, 3);
    assert_eq!(monitor.get_queue_stats("default").await.length, 0);

    gate.notify_one();
    let report = wait_for_terminal(&runtime, &running).await;
    assert_eq!(report.status, TaskState::Success);

    runtime.shutdown().await.unwrap();
}

/* -------------------------------------------------------------------------- */
/* Record retention */
/* -------------------------------------------------------------------------- */

/// Validates the background sweep of finished task records.
///
/// Assertions:
/// - A finished task is dropped once its retention has passed.
/// - Its id then reports PENDING like any unknown id.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cleanup_sweep_drops_finished_tasks() {
    let config = RuntimeConfig {
        result_retention: Duration::from_millis(50),
        cleanup_interval: Duration::from_millis(20),
        ..runtime_config(1)
    };
    let runtime = InMemoryTaskRuntime::new(config);
    runtime.register_handler(Arc::new(RecordingHandler::new("echo")));
    runtime.start().unwrap();

    let id = runtime.submit(TaskSubmission::new("echo", "default", json!({"n": 1}))).await.unwrap();
    assert_eq!(wait_for_terminal(&runtime, &id).await.status, TaskState::Success);

    let dropped = poll_until(Duration::from_secs(5), Duration::from_millis(10), || async {
        runtime.task_info(&id).await.map(|info| info.is_none()).unwrap_or(false)
    })
    .await;
    assert!(dropped, "finished task was never cleaned up");
    assert_eq!(runtime.status(&id).await.unwrap().status, TaskState::Pending);

    runtime.shutdown().await.unwrap();
}
