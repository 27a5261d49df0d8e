//! Resilient execution of job functions

pub mod job_error;
pub mod resilient_call;

pub use job_error::JobError;
pub use resilient_call::ResilientCall;
