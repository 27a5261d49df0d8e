//! Application context - dependency injection container

use std::sync::Arc;

use jobwarden_common::resilience::{CircuitBreakerConfig, CircuitBreakerRegistry};
use jobwarden_core::classification::TaskRetryPolicy;
use jobwarden_core::{
    BatchOrchestrator, BatchService, BatchTaskHandler, ErrorClassifier, JobFunction, LongRunningJob,
    OptimizationTaskHandler, QueueMonitor, ResilientCall,
};
use jobwarden_domain::{BreakerConfig, Config, JobwardenError, Result};
use jobwarden_infra::{config, HttpClient, HttpJob, InMemoryTaskRuntime, RuntimeConfig};
use tracing::{info, warn};

/// Units of work the task handlers delegate to
#[derive(Clone)]
pub struct Jobs {
    pub batch: Arc<dyn JobFunction>,
    pub optimization: Arc<dyn LongRunningJob>,
}

impl Jobs {
    /// Both handlers backed by one HTTP endpoint
    pub fn http(endpoint: &str) -> Result<Self> {
        let client = HttpClient::new()?;
        let job = Arc::new(HttpJob::new(client, endpoint));
        Ok(Self { batch: job.clone(), optimization: job })
    }
}

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub classifier: Arc<ErrorClassifier>,
    pub orchestrator: Arc<BatchOrchestrator>,
    pub runtime: Arc<InMemoryTaskRuntime>,
    pub monitor: Arc<QueueMonitor>,
    pub batches: Arc<BatchService>,
    jobs: Option<Jobs>,
}

impl AppContext {
    /// Build the context from the environment or a config file
    pub async fn new() -> Result<Self> {
        Self::new_with_config(config::load()?).await
    }

    /// Build the context, wiring an HTTP job when an endpoint is configured
    pub async fn new_with_config(config: Config) -> Result<Self> {
        let jobs = match config.dependency.endpoint.as_deref() {
            Some(endpoint) => Some(Jobs::http(endpoint)?),
            None => {
                warn!(
                    component = "app_context",
                    event = "no_endpoint",
                    "No dependency endpoint configured; batch tasks cannot be submitted"
                );
                None
            }
        };
        Self::new_with_jobs(config, jobs).await
    }

    /// Build the context around explicit jobs and start the task runtime
    pub async fn new_with_jobs(config: Config, jobs: Option<Jobs>) -> Result<Self> {
        config::validate(&config)?;

        let breakers = Arc::new(
            CircuitBreakerRegistry::new(registry_defaults(&config.breaker))
                .map_err(|err| JobwardenError::Config(err.to_string()))?,
        );
        // Explicit breaker settings win over the per-model presets
        let breaker = if config.breaker == BreakerConfig::default() {
            breakers.for_model(&config.dependency.model)
        } else {
            breakers.get_or_create(&config.dependency.model)
        }
        .map_err(|err| JobwardenError::Config(err.to_string()))?;

        let classifier = Arc::new(ErrorClassifier::new(config.retry.max_retries));
        let call = ResilientCall::new(breaker, Arc::clone(&classifier));
        let orchestrator = Arc::new(
            BatchOrchestrator::new(call, TaskRetryPolicy::from_settings(&config.retry))
                .with_max_concurrency(config.batch.max_concurrency),
        );

        let runtime = Arc::new(InMemoryTaskRuntime::new(RuntimeConfig::from_batch_config(&config.batch)));
        if let Some(jobs) = &jobs {
            runtime.register_handler(Arc::new(BatchTaskHandler::new(
                Arc::clone(&orchestrator),
                Arc::clone(&jobs.batch),
            )));
            runtime.register_handler(Arc::new(OptimizationTaskHandler::new(
                Arc::clone(&orchestrator),
                Arc::clone(&jobs.optimization),
            )));
        }
        runtime.start()?;

        let monitor = Arc::new(QueueMonitor::with_queues(runtime.clone(), config.queues.known.clone()));
        let batches = Arc::new(BatchService::new(runtime.clone(), config.retry.max_retries));

        info!(
            component = "app_context",
            event = "initialized",
            dependency = %config.dependency.model,
            workers = config.batch.worker_concurrency,
            "Application context initialized"
        );

        Ok(Self { config, breakers, classifier, orchestrator, runtime, monitor, batches, jobs })
    }

    /// Jobs wired into the handlers, if any
    pub fn jobs(&self) -> Option<&Jobs> {
        self.jobs.as_ref()
    }

    /// Stop the task runtime workers
    pub async fn shutdown(&self) -> Result<()> {
        info!(component = "app_context", event = "shutdown", "Shutting down application context");
        self.runtime.shutdown().await?;
        Ok(())
    }
}

fn registry_defaults(breaker: &BreakerConfig) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: breaker.failure_threshold,
        recovery_timeout: breaker.recovery_timeout(),
        success_threshold: breaker.success_threshold,
        call_timeout: breaker.call_timeout(),
        ..CircuitBreakerConfig::default()
    }
}
