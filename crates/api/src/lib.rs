//! # Jobwarden API
//!
//! Application layer - operational commands and dependency wiring.
//!
//! This crate contains:
//! - Commands (batch submission and tracking, queue inspection, breaker stats)
//! - Application context (dependency injection)
//! - The `jobwarden` binary
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
