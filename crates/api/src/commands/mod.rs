//! Operational commands - the surface the CLI drives
//!
//! Every command returns a serde-serializable value so callers can print it
//! as JSON.

mod batches;
mod breakers;
mod queues;

pub use batches::*;
pub use breakers::*;
pub use queues::*;
