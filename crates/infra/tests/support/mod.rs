//! Shared helpers for `jobwarden-infra` integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobwarden_common::resilience::CircuitBreakerConfig;
use jobwarden_common::testing::poll_until;
use jobwarden_core::classification::TaskRetryPolicy;
use jobwarden_core::{
    BatchOrchestrator, ErrorClassifier, JobError, JobFunction, ResilientCall, TaskRuntime,
};
use jobwarden_domain::{TaskState, TaskStatusReport};
use jobwarden_infra::{InMemoryTaskRuntime, RuntimeConfig};
use serde_json::{json, Value};

/// Orchestrator on the system clock with millisecond backoff so retries stay
/// fast in real time
pub fn orchestrator(failure_threshold: u32, max_concurrency: usize) -> Arc<BatchOrchestrator> {
    let config = CircuitBreakerConfig::builder()
        .name("integration-dependency")
        .failure_threshold(failure_threshold)
        .build()
        .unwrap();
    let breaker = jobwarden_common::resilience::CircuitBreaker::new(config).unwrap();
    let call = ResilientCall::new(Arc::new(breaker), Arc::new(ErrorClassifier::default()));
    let policy = TaskRetryPolicy::new(Duration::from_millis(1), Duration::from_millis(10));
    Arc::new(BatchOrchestrator::new(call, policy).with_max_concurrency(max_concurrency))
}

pub fn runtime_config(workers: usize) -> RuntimeConfig {
    RuntimeConfig {
        worker_concurrency: workers,
        revoke_grace: Duration::from_millis(200),
        ..RuntimeConfig::default()
    }
}

/// Wait until the task reaches a terminal state and return its report
pub async fn wait_for_terminal(runtime: &InMemoryTaskRuntime, task_id: &str) -> TaskStatusReport {
    let finished = poll_until(Duration::from_secs(5), Duration::from_millis(10), || async {
        runtime.status(task_id).await.map(|report| report.status.is_terminal()).unwrap_or(false)
    })
    .await;
    assert!(finished, "task {task_id} did not finish in time");
    runtime.status(task_id).await.unwrap()
}

pub async fn wait_for_state(runtime: &InMemoryTaskRuntime, task_id: &str, state: TaskState) {
    let reached = poll_until(Duration::from_secs(5), Duration::from_millis(5), || async {
        runtime.status(task_id).await.map(|report| report.status == state).unwrap_or(false)
    })
    .await;
    assert!(reached, "task {task_id} never reached {state}");
}

/// Upper-cases item ids; ids starting with `missing` fail as not found
pub struct LookupJob;

#[async_trait]
impl JobFunction for LookupJob {
    async fn run(&self, item_id: &str) -> Result<Value, JobError> {
        if item_id.starts_with("missing") {
            return Err(JobError::new("LookupError", format!("record {item_id} not found")));
        }
        Ok(json!({ "item": item_id.to_uppercase() }))
    }
}

pub fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}
