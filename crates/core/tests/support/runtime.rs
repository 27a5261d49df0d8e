//! In-test task runtime

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use jobwarden_core::TaskRuntime;
use jobwarden_domain::{
    JobwardenError, Result, TaskInfo, TaskState, TaskStatusReport, TaskSubmission,
};

/// Records submissions and answers queries from canned state
#[derive(Default)]
pub struct StubRuntime {
    pub submissions: Mutex<Vec<TaskSubmission>>,
    pub statuses: Mutex<HashMap<String, TaskStatusReport>>,
    pub active: Mutex<Vec<TaskInfo>>,
    pub revoked: Mutex<Vec<(String, bool)>>,
    pub queue_lengths: HashMap<String, usize>,
    pub scheduled: HashMap<String, usize>,
}

impl StubRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue(mut self, queue: &str, length: usize, scheduled: usize) -> Self {
        self.queue_lengths.insert(queue.to_string(), length);
        self.scheduled.insert(queue.to_string(), scheduled);
        self
    }

    pub fn set_status(&self, report: TaskStatusReport) {
        self.statuses.lock().unwrap().insert(report.task_id.clone(), report);
    }

    pub fn add_active(&self, task_id: &str, name: &str, queue: &str) {
        self.active.lock().unwrap().push(TaskInfo {
            task_id: task_id.to_string(),
            name: name.to_string(),
            queue: queue.to_string(),
            status: TaskState::Progress,
            worker: Some("worker-1".to_string()),
            started_at: None,
            progress: None,
        });
    }
}

#[async_trait]
impl TaskRuntime for StubRuntime {
    async fn submit(&self, submission: TaskSubmission) -> Result<String> {
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(submission);
        Ok(format!("task-{}", submissions.len()))
    }

    async fn status(&self, task_id: &str) -> Result<TaskStatusReport> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .unwrap_or_else(|| TaskStatusReport::pending(task_id)))
    }

    async fn active_tasks(&self) -> Result<Vec<TaskInfo>> {
        Ok(self.active.lock().unwrap().clone())
    }

    async fn task_info(&self, task_id: &str) -> Result<Option<TaskInfo>> {
        Ok(self.active.lock().unwrap().iter().find(|task| task.task_id == task_id).cloned())
    }

    async fn revoke(&self, task_id: &str, terminate: bool) -> Result<bool> {
        self.revoked.lock().unwrap().push((task_id.to_string(), terminate));
        Ok(true)
    }

    async fn queue_length(&self, queue: &str) -> Result<usize> {
        Ok(self.queue_lengths.get(queue).copied().unwrap_or(0))
    }

    async fn scheduled_count(&self, queue: &str) -> Result<usize> {
        Ok(self.scheduled.get(queue).copied().unwrap_or(0))
    }

    async fn purge(&self, queue: &str) -> Result<usize> {
        Ok(self.queue_lengths.get(queue).copied().unwrap_or(0))
    }
}

/// Runtime whose broker is unreachable
#[derive(Default)]
pub struct UnreachableRuntime;

fn offline<T>() -> Result<T> {
    Err(JobwardenError::Runtime("broker connection refused".to_string()))
}

#[async_trait]
impl TaskRuntime for UnreachableRuntime {
    async fn submit(&self, _submission: TaskSubmission) -> Result<String> {
        offline()
    }

    async fn status(&self, _task_id: &str) -> Result<TaskStatusReport> {
        offline()
    }

    async fn active_tasks(&self) -> Result<Vec<TaskInfo>> {
        offline()
    }

    async fn task_info(&self, _task_id: &str) -> Result<Option<TaskInfo>> {
        offline()
    }

    async fn revoke(&self, _task_id: &str, _terminate: bool) -> Result<bool> {
        offline()
    }

    async fn queue_length(&self, _queue: &str) -> Result<usize> {
        offline()
    }

    async fn scheduled_count(&self, _queue: &str) -> Result<usize> {
        offline()
    }

    async fn purge(&self, _queue: &str) -> Result<usize> {
        offline()
    }
}
