//! Remote service seam: the three endpoints the client consumes.
//!
//! [`LookupApi`] returns raw status + body pairs and leaves the meaning of
//! each status code to the callers (account check, submission, poll loop),
//! so the state machine can be exercised against a scripted fake.

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use persona_core::{Credential, JobId, TargetIdentifier};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Analysis-type tag sent with every submission.
pub const LOOKUP_TYPE: &str = "PSYCH";

/// Lookup-type code sent with every submission.
pub const LOOKUP_ID: u32 = 180;

/// Transport for the remote analysis service.
#[async_trait]
pub trait LookupApi: Send + Sync {
    /// `GET` credit/status check for `credential`.
    async fn credit_stat(&self, credential: &Credential) -> Result<ApiResponse>;

    /// `POST` a new lookup job.
    async fn submit(&self, request: &SubmitRequest<'_>) -> Result<ApiResponse>;

    /// `GET` the status (and, once finished, the result) of `job_id`.
    async fn job_status(&self, job_id: &JobId, credential: &Credential) -> Result<ApiResponse>;
}

/// Status code and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: String,
}

impl ApiResponse {
    /// Build a response from parts.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    /// Returns `ClientError::Parse` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            ClientError::Parse(format!("unexpected response body (status {}): {e}", self.status))
        })
    }
}

/// Body of the lookup submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest<'a> {
    key: &'a str,
    lookup_type: &'static str,
    value: &'a str,
    lookup_id: u32,
}

impl<'a> SubmitRequest<'a> {
    /// Build the fixed-shape request for `target`.
    #[must_use]
    pub fn new(credential: &'a Credential, target: &'a TargetIdentifier) -> Self {
        Self {
            key: credential.expose(),
            lookup_type: LOOKUP_TYPE,
            value: target.as_str(),
            lookup_id: LOOKUP_ID,
        }
    }

    /// Target identifier being submitted.
    #[must_use]
    pub fn value(&self) -> &str {
        self.value
    }
}
