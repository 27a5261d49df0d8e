//! Specialized data structures
//!
//! - **[`ring_buffer`]**: Fixed-size history buffer with oldest-first eviction

pub mod ring_buffer;

pub use ring_buffer::RingBuffer;
