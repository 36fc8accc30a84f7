//! Error types for the lookup client.

use persona_vault::VaultError;
use thiserror::Error;

/// Errors that can occur while validating, submitting, polling, or
/// normalizing a lookup.
///
/// Every variant is terminal for the current operation. `TransientPoll` is
/// the one the poll loop absorbs and retries; it only reaches the caller
/// wrapped in `PollTimeout`'s `last_error`.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Target identifier failed the syntax check; no request was made
    #[error("invalid target identifier: {0}")]
    InvalidIdentifier(String),

    /// No credential supplied and none stored
    #[error("no API key stored; supply one first")]
    NoCredential,

    /// Credential rejected by the remote account check
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Submission did not return HTTP 201
    #[error("lookup submission failed: status {status}, {message}")]
    Submission {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The service reported the job as not found (HTTP 404)
    #[error("lookup {job_id} not found or invalid request")]
    NotFound {
        /// Job identifier
        job_id: String,
    },

    /// A status check failed in a way worth retrying
    #[error("status check failed{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    TransientPoll {
        /// HTTP status code, if a response arrived
        status: Option<u16>,
        /// Error detail
        message: String,
    },

    /// The poll budget (attempts or deadline) ran out
    #[error("lookup {job_id} did not finish after {attempts} status checks in {elapsed_secs}s{}", .last_error.as_ref().map(|e| format!(" (last error: {e})")).unwrap_or_default())]
    PollTimeout {
        /// Job identifier
        job_id: String,
        /// Status checks performed
        attempts: u32,
        /// Seconds spent polling
        elapsed_secs: u64,
        /// Most recent transient failure, if any
        last_error: Option<String>,
    },

    /// The caller cancelled the lookup
    #[error("lookup {job_id} cancelled")]
    Cancelled {
        /// Job identifier
        job_id: String,
    },

    /// The job reported completion but the final retrieval carried no result
    #[error("lookup {job_id} finished but the result could not be retrieved: {reason}")]
    IncompleteResult {
        /// Job identifier
        job_id: String,
        /// What was missing
        reason: String,
    },

    /// Response payload did not have the expected structure
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Client misconfiguration (e.g. an unusable base URL)
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential storage error
    #[error("credential store error: {0}")]
    Vault(#[from] VaultError),
}

impl ClientError {
    /// Whether a poll attempt that failed with this error may be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientPoll { .. } | Self::Network(_))
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
