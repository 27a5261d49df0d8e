//! Observability infrastructure
//!
//! All components log through `tracing` with structured `component` and
//! `event` fields; this module installs the subscriber that renders them.

pub mod logging;

pub use logging::{build_filter, init_logging};
