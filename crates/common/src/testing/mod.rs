//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: polling helpers for background work
//! - **[`sleeper`]**: a [`Sleeper`](crate::resilience::Sleeper) that records
//!   backoff delays instead of waiting
//!
//! [`MockClock`] is re-exported so tests can drive circuit breakers from one
//! import.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use jobwarden_common::testing::{MockClock, RecordingSleeper};
//!
//! let clock = MockClock::new();
//! clock.advance(Duration::from_secs(5));
//!
//! let sleeper = RecordingSleeper::new();
//! assert!(sleeper.recorded().is_empty());
//! ```

pub mod async_utils;
pub mod sleeper;

pub use async_utils::{poll_until, timeout_ok};
pub use sleeper::RecordingSleeper;

pub use crate::resilience::clock::{Clock, MockClock, SystemClock};
