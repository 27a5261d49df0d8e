//! Shared test helpers for `jobwarden-core` integration tests.
//!
//! Lightweight fakes for the task runtime and job functions so the scenario
//! tests can focus on behaviour instead of wiring.

#![allow(dead_code)]

pub mod jobs;
pub mod runtime;

use std::sync::{Arc, Mutex};

use jobwarden_common::resilience::{CircuitBreakerConfig, MockClock};
use jobwarden_common::testing::RecordingSleeper;
use jobwarden_core::classification::TaskRetryPolicy;
use jobwarden_core::{BatchOrchestrator, ErrorClassifier, ProgressSink, ResilientCall};
use jobwarden_domain::BatchProgress;

pub type TestOrchestrator = BatchOrchestrator<MockClock, RecordingSleeper>;

/// Orchestrator over a mock-clock breaker whose backoff sleeps are recorded
/// instead of awaited
pub fn orchestrator(failure_threshold: u32) -> (TestOrchestrator, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let breaker = CircuitBreakerConfig::builder()
        .name("test-dependency")
        .clock(MockClock::new())
        .failure_threshold(failure_threshold)
        .build()
        .unwrap();
    let call = ResilientCall::new(Arc::new(breaker), Arc::new(ErrorClassifier::default()));
    (BatchOrchestrator::with_sleeper(call, TaskRetryPolicy::default(), sleeper.clone()), sleeper)
}

/// Progress sink that keeps every update
#[derive(Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<BatchProgress>>,
}

impl RecordingProgress {
    pub fn updates(&self) -> Vec<BatchProgress> {
        self.updates.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn publish(&self, progress: BatchProgress) {
        self.updates.lock().unwrap().push(progress);
    }
}

pub fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}
