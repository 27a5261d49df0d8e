//! Classification and orchestration benchmarks
//!
//! Run with: `cargo bench --bench classifier_bench -p jobwarden-core`

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jobwarden_common::resilience::CircuitBreaker;
use jobwarden_core::classification::TaskRetryPolicy;
use jobwarden_core::{
    BatchOrchestrator, ErrorClassifier, JobError, JobFunction, ResilientCall, RunOptions,
};
use serde_json::{json, Value};

const MESSAGES: &[&str] = &[
    "database connection timeout",
    "upstream service unavailable (503)",
    "inference endpoint timed out",
    "rate limit exceeded: too many requests",
    "validation failed: amount must be positive",
    "something nobody anticipated",
];

struct EchoJob;

#[async_trait]
impl JobFunction for EchoJob {
    async fn run(&self, item_id: &str) -> Result<Value, JobError> {
        Ok(json!({ "item": item_id }))
    }
}

fn classify_benchmark(c: &mut Criterion) {
    let classifier = ErrorClassifier::default();
    let context = BTreeMap::new();

    let mut group = c.benchmark_group("error_classifier");
    group.bench_function("classify_message", |b| {
        b.iter(|| {
            for message in MESSAGES {
                black_box(classifier.classify_message("BenchError", black_box(message), &context));
            }
        });
    });
    group.finish();
}

fn run_batch_benchmark(c: &mut Criterion) {
    let breaker = CircuitBreaker::new(Default::default()).expect("default config");
    let call = ResilientCall::new(Arc::new(breaker), Arc::new(ErrorClassifier::default()));
    let orchestrator = BatchOrchestrator::new(call, TaskRetryPolicy::default()).with_max_concurrency(8);
    let items: Vec<String> = (0..64).map(|idx| format!("item-{idx}")).collect();

    let mut group = c.benchmark_group("batch_orchestrator");
    group.sample_size(20);
    group.bench_function("run_batch_64_items", |b| {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        b.iter(|| {
            runtime.block_on(async {
                black_box(orchestrator.run_batch(&items, &EchoJob, 0, RunOptions::default()).await);
            });
        });
    });
    group.finish();
}

criterion_group!(core_benchmarks, classify_benchmark, run_batch_benchmark);
criterion_main!(core_benchmarks);
