//! # Jobwarden Domain
//!
//! Business domain types and models for Jobwarden.
//!
//! This crate contains:
//! - The task error taxonomy (`TaskErrorCode`, `TaskError`)
//! - Batch and task runtime data types
//! - Domain error types and Result definitions
//! - Configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other Jobwarden crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
