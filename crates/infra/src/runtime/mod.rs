//! Task runtime adapters
//!
//! [`InMemoryTaskRuntime`] implements the core `TaskRuntime` port inside the
//! current process: a priority queue drained by a fixed pool of tokio
//! workers, with eta scheduling, revocation and a hard time limit.

pub mod error;
pub mod in_memory;

pub use error::{RuntimeError, RuntimeResult};
pub use in_memory::{InMemoryTaskRuntime, RuntimeConfig};
