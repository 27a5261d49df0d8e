//! Port interfaces for the background task runtime

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobwarden_domain::{Result, TaskInfo, TaskStatusReport, TaskSubmission};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::batch::ports::ProgressSink;

/// Trait for the queue/worker runtime that executes submitted tasks
#[async_trait]
pub trait TaskRuntime: Send + Sync {
    // Submission
    /// Enqueue a task and return its id
    async fn submit(&self, submission: TaskSubmission) -> Result<String>;

    // Task queries
    /// Current status; ids the runtime has never seen report `PENDING`
    async fn status(&self, task_id: &str) -> Result<TaskStatusReport>;

    /// Tasks currently executing on a worker
    async fn active_tasks(&self) -> Result<Vec<TaskInfo>>;

    /// Details of one task, if the runtime knows it
    async fn task_info(&self, task_id: &str) -> Result<Option<TaskInfo>>;

    // Control
    /// Revoke a task; `terminate` also stops it if it is already running
    async fn revoke(&self, task_id: &str, terminate: bool) -> Result<bool>;

    // Queue queries
    /// Number of tasks waiting in `queue`
    async fn queue_length(&self, queue: &str) -> Result<usize>;

    /// Number of tasks in `queue` held back until their eta
    async fn scheduled_count(&self, queue: &str) -> Result<usize>;

    /// Drop every waiting task in `queue`, returning how many were removed
    async fn purge(&self, queue: &str) -> Result<usize>;
}

/// Everything a handler gets from the runtime besides its payload
#[derive(Clone)]
pub struct TaskContext {
    pub task_id: String,
    pub progress: Arc<dyn ProgressSink>,
    pub cancellation: CancellationToken,
    /// Budget after which the handler should wrap up with partial results
    pub soft_time_limit: Option<Duration>,
}

/// A named unit of work the runtime dispatches submissions to
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Task name matched against [`TaskSubmission::name`]
    fn name(&self) -> &str;

    /// Execute one submission
    async fn handle(&self, payload: Value, context: TaskContext) -> Result<Value>;
}
