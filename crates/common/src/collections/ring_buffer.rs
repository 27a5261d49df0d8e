//! A fixed-capacity history buffer that evicts its oldest entry when full.
//!
//! [`RingBuffer`] keeps the most recent `capacity` items in insertion order.
//! It backs bounded histories such as a circuit breaker's recent state
//! transitions, where only the last few records matter and memory must not
//! grow with uptime.
//!
//! # Complexity
//! - `push`, `len`, `is_full`, `latest` and `oldest` are **O(1)**.
//! - `to_vec` is **O(n)** and clones every stored item.

use std::collections::VecDeque;

use serde::{Serialize, Serializer};

/// Bounded FIFO history.
///
/// # Examples
///
/// ```rust
/// use jobwarden_common::collections::RingBuffer;
///
/// let mut history = RingBuffer::new(2);
/// history.push("closed->open");
/// history.push("open->half_open");
/// history.push("half_open->closed"); // evicts "closed->open"
///
/// assert_eq!(history.to_vec(), vec!["open->half_open", "half_open->closed"]);
/// assert_eq!(history.latest(), Some(&"half_open->closed"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer; a capacity of zero is clamped to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { buf: VecDeque::with_capacity(capacity), capacity }
    }

    /// Appends an item, returning the evicted oldest item if the buffer was
    /// full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() { self.buf.pop_front() } else { None };
        self.buf.push_back(item);
        evicted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed item
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.buf.back()
    }

    /// Oldest item still retained
    #[must_use]
    pub fn oldest(&self) -> Option<&T> {
        self.buf.front()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Snapshot of the contents, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.buf.iter().cloned().collect()
    }
}

impl<T: Serialize> Serialize for RingBuffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.buf.iter())
    }
}
