//! # Jobwarden Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The in-process task runtime (worker pool, eta scheduling, time limits)
//! - The HTTP job function adapter
//! - Configuration loading (environment, TOML, JSON)
//! - Logging initialization
//!
//! ## Architecture
//! - Implements traits defined in `jobwarden-core`
//! - Contains all "impure" code (I/O, spawned tasks, HTTP)

pub mod config;
pub mod errors;
pub mod http;
pub mod jobs;
pub mod observability;
pub mod runtime;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::HttpClient;
pub use jobs::HttpJob;
pub use observability::init_logging;
pub use runtime::{InMemoryTaskRuntime, RuntimeConfig};
