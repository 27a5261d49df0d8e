//! Scripted job functions

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use jobwarden_core::{JobError, JobFunction, LongRunningJob};
use serde_json::{json, Value};

/// Job whose behaviour per item is given up front
///
/// Items listed in `failures` fail with the given message that many times
/// before succeeding; `u32::MAX` means always fail.
#[derive(Default)]
pub struct ScriptedJob {
    failures: HashMap<String, (String, u32)>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, item: &str, message: &str, times: u32) -> Self {
        self.failures.insert(item.to_string(), (message.to_string(), times));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, item: &str) -> usize {
        self.calls().iter().filter(|call| call.as_str() == item).count()
    }
}

#[async_trait]
impl JobFunction for ScriptedJob {
    async fn run(&self, item_id: &str) -> Result<Value, JobError> {
        let previous = {
            let mut calls = self.calls.lock().unwrap();
            let previous = calls.iter().filter(|call| call.as_str() == item_id).count();
            calls.push(item_id.to_string());
            previous
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.failures.get(item_id) {
            Some((message, times)) if (previous as u64) < u64::from(*times) => {
                Err(JobError::new("ScriptedFailure", message.clone()))
            }
            _ => Ok(json!({ "item": item_id, "processed": true })),
        }
    }
}

/// Long-running job that fails a fixed number of times first
pub struct FlakyOptimizer {
    failures_left: AtomicU32,
    message: String,
}

impl FlakyOptimizer {
    pub fn new(failures: u32, message: &str) -> Self {
        Self { failures_left: AtomicU32::new(failures), message: message.to_string() }
    }
}

#[async_trait]
impl LongRunningJob for FlakyOptimizer {
    async fn run(&self, config: &Value) -> Result<Value, JobError> {
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(JobError::new("OptimizerError", self.message.clone()));
        }
        Ok(json!({ "optimized": true, "config": config }))
    }
}
