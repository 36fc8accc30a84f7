//! `reqwest`-backed implementation of [`LookupApi`].

use crate::api::{ApiResponse, LookupApi, SubmitRequest};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use persona_core::{Credential, JobId, ServiceConfig};
use reqwest::{Client, Url};
use std::time::Duration;

/// Build the HTTP client with the configured timeout.
///
/// # Errors
/// Returns error if the HTTP client cannot be created.
pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("persona/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ClientError::InvalidConfig(format!("failed to create HTTP client: {e}")))
}

/// HTTP client for the analysis service.
#[derive(Debug, Clone)]
pub struct HttpLookupApi {
    client: Client,
    base_url: Url,
}

impl HttpLookupApi {
    /// Create a client from service settings.
    ///
    /// # Errors
    /// Returns error if the base URL is unusable or the HTTP client cannot be created.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ClientError::InvalidConfig(format!("invalid base URL '{}': {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidConfig(format!(
                "base URL '{}' cannot have paths appended",
                config.base_url
            )));
        }

        Ok(Self {
            client: build_http_client(config.request_timeout_secs)?,
            base_url,
        })
    }

    /// Append path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidConfig("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and collect status and body.
    ///
    /// URLs carry the credential as a query parameter, so it is stripped
    /// from transport errors before they propagate.
    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<ApiResponse> {
        let response = request
            .header("content-type", "application/json")
            .send()
            .await
            .map_err(|e| ClientError::Network(e.without_url()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.without_url()))?;

        tracing::debug!("{} response: status {}, body {}", what, status, body);
        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl LookupApi for HttpLookupApi {
    async fn credit_stat(&self, credential: &Credential) -> Result<ApiResponse> {
        let url = self.endpoint(&["request-monitor", "credit-stat"])?;
        let request = self
            .client
            .get(url)
            .query(&[("key", credential.expose())]);
        self.send(request, "credit-stat").await
    }

    async fn submit(&self, request: &SubmitRequest<'_>) -> Result<ApiResponse> {
        let url = self.endpoint(&["developer", "psycho_profile"])?;
        let request = self.client.post(url).json(request);
        self.send(request, "submit").await
    }

    async fn job_status(&self, job_id: &JobId, credential: &Credential) -> Result<ApiResponse> {
        let url = self.endpoint(&["request-monitor", "api-usage", job_id.as_str()])?;
        let request = self
            .client
            .get(url)
            .query(&[("key", credential.expose())]);
        self.send(request, "job status").await
    }
}
