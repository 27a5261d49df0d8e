use std::time::Duration;

use jobwarden_domain::JobwardenError;
use reqwest::{Client as ReqwestClient, IntoUrl};
use serde_json::Value;
use tracing::debug;

use crate::errors::{describe_http_status, InfraError};

/// Thin JSON-over-HTTP client.
///
/// Makes exactly one attempt per call. Retries, backoff and circuit breaking
/// are applied by the caller's resilient call path, so they are not repeated
/// here.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, InfraError> {
        Self::builder().build()
    }

    /// POST `body` as JSON and decode the JSON response.
    ///
    /// Non-2xx statuses become `Dependency` errors whose message names the
    /// failure class (rate limited, unavailable, not found, ...). An empty
    /// body decodes as `null`.
    pub async fn post_json<U>(&self, url: U, body: &Value) -> Result<Value, InfraError>
    where
        U: IntoUrl,
    {
        let url = url.into_url()?;
        debug!(%url, "sending HTTP request");

        let response = self.client.post(url.clone()).json(body).send().await?;
        let status = response.status();
        debug!(%url, %status, "received HTTP response");

        if !status.is_success() {
            return Err(InfraError(JobwardenError::Dependency(describe_http_status(status))));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|err| {
            InfraError(JobwardenError::Dependency(format!("invalid response from endpoint: {err}")))
        })
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: Some(concat!("jobwarden/", env!("CARGO_PKG_VERSION")).to_string()),
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    /// Transport-level timeout; keep it at or above the breaker call timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, InfraError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        Ok(HttpClient { client: builder.build()? })
    }
}
