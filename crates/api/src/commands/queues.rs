//! Queue inspection and maintenance commands

use std::collections::BTreeMap;

use jobwarden_domain::{QueueSnapshot, Result, TaskInfo};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::utils::command_helpers::execute_logged;

/// Outcome of `purge_queue`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub queue: String,
    pub purged: usize,
}

/// Snapshots of every known queue.
pub async fn list_queues(ctx: &AppContext) -> Result<BTreeMap<String, QueueSnapshot>> {
    execute_logged("queues::list_queues", || async { Ok(ctx.monitor.get_all_queue_stats().await) }).await
}

pub async fn get_queue_stats(ctx: &AppContext, queue: &str) -> Result<QueueSnapshot> {
    execute_logged("queues::get_queue_stats", || async { Ok(ctx.monitor.get_queue_stats(queue).await) }).await
}

/// Drop every waiting task in `queue`.
pub async fn purge_queue(ctx: &AppContext, queue: &str) -> Result<PurgeResponse> {
    execute_logged("queues::purge_queue", || async {
        let purged = ctx.monitor.purge_queue(queue).await;
        Ok(PurgeResponse { queue: queue.to_string(), purged })
    })
    .await
}

pub async fn list_active_tasks(ctx: &AppContext, queue: Option<&str>) -> Result<Vec<TaskInfo>> {
    execute_logged("queues::list_active_tasks", || async { Ok(ctx.monitor.list_active_tasks(queue).await) })
        .await
}

pub async fn get_task_info(ctx: &AppContext, task_id: &str) -> Result<Option<TaskInfo>> {
    execute_logged("queues::get_task_info", || async { Ok(ctx.monitor.get_task_info(task_id).await) }).await
}
