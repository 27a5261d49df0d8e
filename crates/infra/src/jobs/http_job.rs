//! Job function that delegates each unit of work to an HTTP endpoint
//!
//! Batch items are sent as `{"item_id": ...}` and long-running jobs as
//! `{"config": ...}`; the endpoint's JSON response becomes the result.

use async_trait::async_trait;
use jobwarden_core::{JobError, JobFunction, LongRunningJob};
use jobwarden_domain::JobwardenError;
use serde_json::{json, Value};

use crate::errors::InfraError;
use crate::http::HttpClient;

/// Error type name reported to the classifier for HTTP failures
pub const HTTP_ERROR_TYPE: &str = "HttpError";

/// POSTs every unit of work to one endpoint
#[derive(Clone)]
pub struct HttpJob {
    client: HttpClient,
    endpoint: String,
}

impl HttpJob {
    pub fn new(client: HttpClient, endpoint: impl Into<String>) -> Self {
        Self { client, endpoint: endpoint.into() }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, body: Value) -> Result<Value, JobError> {
        self.client.post_json(self.endpoint.as_str(), &body).await.map_err(into_job_error)
    }
}

fn into_job_error(err: InfraError) -> JobError {
    let message = match err.0 {
        JobwardenError::Dependency(message) => message,
        other => other.to_string(),
    };
    JobError::new(HTTP_ERROR_TYPE, message)
}

#[async_trait]
impl JobFunction for HttpJob {
    async fn run(&self, item_id: &str) -> Result<Value, JobError> {
        self.post(json!({ "item_id": item_id })).await
    }
}

#[async_trait]
impl LongRunningJob for HttpJob {
    async fn run(&self, config: &Value) -> Result<Value, JobError> {
        self.post(json!({ "config": config })).await
    }
}
