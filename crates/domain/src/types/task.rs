//! Task runtime types
//!
//! These are the shapes exchanged with the task-execution runtime: what gets
//! submitted, how a task's status is reported back, and the per-queue
//! snapshots the queue monitor produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::impl_status_conversions;
use crate::types::batch::BatchProgress;

/// Lifecycle state of a task as reported by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Pending,
    Progress,
    Success,
    Failure,
    Retry,
    Revoked,
}

impl_status_conversions!(TaskState {
    Pending => "PENDING",
    Progress => "PROGRESS",
    Success => "SUCCESS",
    Failure => "FAILURE",
    Retry => "RETRY",
    Revoked => "REVOKED",
});

impl TaskState {
    /// Whether the task can no longer change state
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Revoked)
    }
}

/// Submission priority, higher runs first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl_status_conversions!(TaskPriority {
    Low => "LOW",
    Normal => "NORMAL",
    High => "HIGH",
    Critical => "CRITICAL",
});

impl TaskPriority {
    /// Numeric level understood by priority-aware brokers (0..=10)
    pub const fn level(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Normal => 5,
            Self::High => 9,
            Self::Critical => 10,
        }
    }
}

/// A unit of work handed to the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSubmission {
    /// Registered task name the runtime dispatches on
    pub name: String,
    pub queue: String,
    pub payload: Value,
    #[serde(default)]
    pub priority: TaskPriority,
    /// Earliest time the task may start; `None` means immediately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<DateTime<Utc>>,
}

impl TaskSubmission {
    pub fn new(name: impl Into<String>, queue: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            queue: queue.into(),
            payload,
            priority: TaskPriority::Normal,
            eta: None,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_eta(mut self, eta: DateTime<Utc>) -> Self {
        self.eta = Some(eta);
        self
    }
}

/// Status of a single task as polled from the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusReport {
    pub task_id: String,
    pub status: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<BatchProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskStatusReport {
    /// Report for a task the runtime knows nothing about yet
    pub fn pending(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskState::Pending,
            progress: None,
            result: None,
            error: None,
        }
    }
}

/// Description of a task currently known to a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task_id: String,
    pub name: String,
    pub queue: String,
    pub status: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<BatchProgress>,
}

/// Point-in-time view of one queue; never cached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub queue_name: String,
    pub length: usize,
    pub active_tasks: usize,
    pub scheduled_tasks: usize,
    pub total_pending: usize,
    /// Set when the runtime could not be reached and counts were zeroed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueueSnapshot {
    pub fn new(
        queue_name: impl Into<String>,
        length: usize,
        active_tasks: usize,
        scheduled_tasks: usize,
    ) -> Self {
        Self {
            queue_name: queue_name.into(),
            length,
            active_tasks,
            scheduled_tasks,
            total_pending: length + scheduled_tasks,
            error: None,
        }
    }

    /// Zero-valued snapshot carrying the failure that produced it
    pub fn unavailable(queue_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), ..Self::new(queue_name, 0, 0, 0) }
    }
}
