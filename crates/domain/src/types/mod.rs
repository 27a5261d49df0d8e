//! Domain types and models

pub mod batch;
pub mod task;
pub mod task_error;

pub use batch::{
    BatchJob, BatchJobResult, BatchJobType, BatchProgress, BatchRunStatus, BatchStatusReport,
    ItemOutcome, ItemStatus,
};
pub use task::{
    QueueSnapshot, TaskInfo, TaskPriority, TaskState, TaskStatusReport, TaskSubmission,
};
pub use task_error::{TaskError, TaskErrorCode};
