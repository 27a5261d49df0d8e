//! Operational visibility into queues and running tasks
//!
//! The monitor never fails: when the runtime cannot answer, it logs the
//! error and returns a zeroed snapshot, an empty list, `false`, `0` or
//! `None` so operator tooling keeps working.

use std::collections::BTreeMap;
use std::sync::Arc;

use jobwarden_domain::constants::KNOWN_QUEUES;
use jobwarden_domain::{JobwardenError, QueueSnapshot, TaskInfo};
use tracing::{error, info, instrument};

use super::ports::TaskRuntime;

/// Read-mostly view over a [`TaskRuntime`]
pub struct QueueMonitor {
    runtime: Arc<dyn TaskRuntime>,
    known_queues: Vec<String>,
}

impl QueueMonitor {
    /// Monitor over the default queue set
    pub fn new(runtime: Arc<dyn TaskRuntime>) -> Self {
        Self::with_queues(runtime, KNOWN_QUEUES.iter().map(|q| (*q).to_string()).collect())
    }

    pub fn with_queues(runtime: Arc<dyn TaskRuntime>, known_queues: Vec<String>) -> Self {
        Self { runtime, known_queues }
    }

    pub fn known_queues(&self) -> &[String] {
        &self.known_queues
    }

    /// Fresh snapshot of one queue
    #[instrument(skip(self))]
    pub async fn get_queue_stats(&self, queue: &str) -> QueueSnapshot {
        match self.collect_snapshot(queue).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(
                    component = "queue_monitor",
                    event = "stats_failed",
                    queue,
                    error = %err,
                    "Failed to collect queue stats"
                );
                QueueSnapshot::unavailable(queue, err.to_string())
            }
        }
    }

    /// Snapshots of every known queue, keyed by queue name
    pub async fn get_all_queue_stats(&self) -> BTreeMap<String, QueueSnapshot> {
        let mut stats = BTreeMap::new();
        for queue in &self.known_queues {
            stats.insert(queue.clone(), self.get_queue_stats(queue).await);
        }
        stats
    }

    /// Running tasks, optionally restricted to one queue
    pub async fn list_active_tasks(&self, queue: Option<&str>) -> Vec<TaskInfo> {
        match self.runtime.active_tasks().await {
            Ok(tasks) => tasks.into_iter().filter(|task| queue.map_or(true, |q| task.queue == q)).collect(),
            Err(err) => {
                error!(component = "queue_monitor", event = "list_failed", error = %err, "Failed to list active tasks");
                Vec::new()
            }
        }
    }

    /// Revoke a task; returns whether the runtime accepted the revocation
    #[instrument(skip(self))]
    pub async fn cancel_task(&self, task_id: &str, terminate: bool) -> bool {
        match self.runtime.revoke(task_id, terminate).await {
            Ok(revoked) => {
                info!(component = "queue_monitor", event = "task_cancelled", task_id, terminate, revoked, "Task revocation requested");
                revoked
            }
            Err(err) => {
                error!(component = "queue_monitor", event = "cancel_failed", task_id, error = %err, "Failed to cancel task");
                false
            }
        }
    }

    /// Remove all waiting tasks from `queue`; returns the number removed
    #[instrument(skip(self))]
    pub async fn purge_queue(&self, queue: &str) -> usize {
        match self.runtime.purge(queue).await {
            Ok(purged) => {
                info!(component = "queue_monitor", event = "queue_purged", queue, purged, "Queue purged");
                purged
            }
            Err(err) => {
                error!(component = "queue_monitor", event = "purge_failed", queue, error = %err, "Failed to purge queue");
                0
            }
        }
    }

    /// Details of one task, or `None` if unknown or the runtime failed
    pub async fn get_task_info(&self, task_id: &str) -> Option<TaskInfo> {
        match self.runtime.task_info(task_id).await {
            Ok(info) => info,
            Err(err) => {
                error!(component = "queue_monitor", event = "task_info_failed", task_id, error = %err, "Failed to get task info");
                None
            }
        }
    }

    async fn collect_snapshot(&self, queue: &str) -> Result<QueueSnapshot, JobwardenError> {
        let length = self.runtime.queue_length(queue).await?;
        let scheduled = self.runtime.scheduled_count(queue).await?;
        let active = self.runtime.active_tasks().await?.iter().filter(|task| task.queue == queue).count();
        Ok(QueueSnapshot::new(queue, length, active, scheduled))
    }
}
