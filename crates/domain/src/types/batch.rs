//! Batch processing types
//!
//! A batch run owns one [`BatchJobResult`] while it is in progress and hands
//! it out by value once finished. Observers only ever see [`BatchProgress`]
//! copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::impl_status_conversions;
use crate::types::task::{TaskPriority, TaskState, TaskStatusReport};
use crate::types::task_error::TaskError;

/* -------------------------------------------------------------------------- */
/* Per-item outcomes */
/* -------------------------------------------------------------------------- */

/// Final status of a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Failed,
}

impl_status_conversions!(ItemStatus {
    Success => "success",
    Failed => "failed",
});

/// Outcome of processing one item, in submission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item_id: String,
    pub status: ItemStatus,
    /// Number of attempts made, including the first one
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl ItemOutcome {
    pub fn success(item_id: impl Into<String>, result: Value, attempts: u32) -> Self {
        Self {
            item_id: item_id.into(),
            status: ItemStatus::Success,
            attempts,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(item_id: impl Into<String>, error: TaskError, attempts: u32) -> Self {
        Self {
            item_id: item_id.into(),
            status: ItemStatus::Failed,
            attempts,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Success
    }
}

/* -------------------------------------------------------------------------- */
/* Aggregate result */
/* -------------------------------------------------------------------------- */

/// How a batch run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchRunStatus {
    /// Every item reached a final outcome
    Completed,
    /// The time budget ran out; counts cover completed items only
    Timeout,
    /// The run was cancelled; unfinished items are recorded as failed
    Cancelled,
}

impl_status_conversions!(BatchRunStatus {
    Completed => "completed",
    Timeout => "timeout",
    Cancelled => "cancelled",
});

/// Aggregate result of one batch run
///
/// Counters are only updated through [`BatchJobResult::record`], which keeps
/// `successful + failed == total_processed == results.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJobResult {
    status: BatchRunStatus,
    total_items: usize,
    total_processed: usize,
    successful: usize,
    failed: usize,
    results: Vec<ItemOutcome>,
}

impl BatchJobResult {
    /// Start an empty result for a batch of `total_items`
    pub fn new(total_items: usize) -> Self {
        Self {
            status: BatchRunStatus::Completed,
            total_items,
            total_processed: 0,
            successful: 0,
            failed: 0,
            results: Vec::with_capacity(total_items),
        }
    }

    /// Append one item outcome
    pub fn record(&mut self, outcome: ItemOutcome) {
        if outcome.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.total_processed += 1;
        self.results.push(outcome);
    }

    /// Seal the result with its run status
    pub fn finish(mut self, status: BatchRunStatus) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> BatchRunStatus {
        self.status
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn total_processed(&self) -> usize {
        self.total_processed
    }

    pub fn successful(&self) -> usize {
        self.successful
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn results(&self) -> &[ItemOutcome] {
        &self.results
    }
}

/* -------------------------------------------------------------------------- */
/* Progress */
/* -------------------------------------------------------------------------- */

/// Progress snapshot published while a batch runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

impl BatchProgress {
    pub fn new(current: usize, total: usize, message: impl Into<String>) -> Self {
        Self { current, total, message: message.into() }
    }

    /// Completion as a percentage in `0.0..=100.0`
    ///
    /// An empty batch counts as fully complete.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let pct = (self.current as f64 / self.total as f64) * 100.0;
        pct.min(100.0)
    }
}

/* -------------------------------------------------------------------------- */
/* Submission records */
/* -------------------------------------------------------------------------- */

/// Kind of background job submitted through the batch service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchJobType {
    BatchProcessing,
    Optimization,
}

impl_status_conversions!(BatchJobType {
    BatchProcessing => "batch_processing",
    Optimization => "optimization",
});

/// Record returned when a job is submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub task_id: String,
    pub job_type: BatchJobType,
    pub description: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub item_count: usize,
    pub priority: TaskPriority,
}

/// Operator-facing status of a submitted batch
///
/// Always well formed: an id the runtime has never seen reports `PENDING`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatusReport {
    pub task_id: String,
    pub status: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<BatchProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<TaskStatusReport> for BatchStatusReport {
    fn from(report: TaskStatusReport) -> Self {
        let progress_percentage = report.progress.as_ref().map(BatchProgress::percentage);
        Self {
            task_id: report.task_id,
            status: report.status,
            progress: report.progress,
            progress_percentage,
            result: report.result,
            error: report.error,
        }
    }
}
