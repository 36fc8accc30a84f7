//! Target validation and job submission.

use crate::api::{LookupApi, SubmitRequest};
use crate::error::{ClientError, Result};
use persona_core::{Credential, JobId, PersonaError, TargetIdentifier};
use serde::Deserialize;

/// Offline syntax check for a target identifier.
#[must_use]
pub fn validate_identifier_syntax(id: &str) -> bool {
    TargetIdentifier::is_valid_syntax(id)
}

/// Parse operator input into a [`TargetIdentifier`].
///
/// # Errors
/// Returns `ClientError::InvalidIdentifier` if the syntax check fails.
pub fn parse_target(raw: &str) -> Result<TargetIdentifier> {
    TargetIdentifier::new(raw.trim()).map_err(|e| match e {
        PersonaError::InvalidIdentifier(message) => ClientError::InvalidIdentifier(message),
        other => ClientError::InvalidIdentifier(other.to_string()),
    })
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: JobId,
}

/// Submit a lookup for `target` and return the job id.
///
/// Only HTTP 201 counts as accepted. There is no retry here; any other
/// status ends the lookup.
///
/// # Errors
/// Returns `ClientError::Submission` for a non-201 answer, or
/// `ClientError::Parse` if the accepted response carries no job id.
pub async fn submit<A>(api: &A, credential: &Credential, target: &TargetIdentifier) -> Result<JobId>
where
    A: LookupApi + ?Sized,
{
    let request = SubmitRequest::new(credential, target);
    let response = api.submit(&request).await?;

    if response.status != 201 {
        tracing::warn!(
            "Lookup for {} rejected with status {}",
            target,
            response.status
        );
        return Err(ClientError::Submission {
            status: response.status,
            message: response.body,
        });
    }

    let SubmitResponse { id } = response.json()?;
    tracing::info!("Lookup for {} submitted as job {}", target, id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedApi;
    use crate::ApiResponse;

    fn credential() -> Credential {
        Credential::new("test-api-key-12345").expect("valid credential")
    }

    #[test]
    fn test_identifier_syntax() {
        assert!(validate_identifier_syntax("100077649716158"));
        assert!(validate_identifier_syntax("eloy.simoesjr"));
        assert!(validate_identifier_syntax("some_user-01"));
        assert!(!validate_identifier_syntax("bad id!"));
        assert!(!validate_identifier_syntax(""));
    }

    #[test]
    fn test_parse_target() {
        let target = parse_target("  eloy.simoesjr\n").expect("valid");
        assert_eq!(target.as_str(), "eloy.simoesjr");

        assert!(matches!(
            parse_target("bad id!"),
            Err(ClientError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_created_returns_job_id() {
        let api = ScriptedApi::new().with_submit(ApiResponse::new(201, r#"{"id": 98765}"#));
        let target = parse_target("100077649716158").expect("valid");

        let job = submit(&api, &credential(), &target).await.expect("submit");

        assert_eq!(job.as_str(), "98765");
        assert_eq!(api.submitted_values(), vec!["100077649716158"]);
    }

    #[tokio::test]
    async fn test_submit_ok_is_not_created() {
        let api = ScriptedApi::new().with_submit(ApiResponse::new(200, r#"{"id": 1}"#));
        let target = parse_target("eloy.simoesjr").expect("valid");

        let result = submit(&api, &credential(), &target).await;
        assert!(matches!(
            result,
            Err(ClientError::Submission { status: 200, .. })
        ));
        assert_eq!(api.submit_calls(), 1);
    }

    #[tokio::test]
    async fn test_submit_rejection_carries_body() {
        let api = ScriptedApi::new().with_submit(ApiResponse::new(402, "Insufficient credits"));
        let target = parse_target("eloy.simoesjr").expect("valid");

        match submit(&api, &credential(), &target).await {
            Err(ClientError::Submission { status, message }) => {
                assert_eq!(status, 402);
                assert_eq!(message, "Insufficient credits");
            }
            other => panic!("expected Submission error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_without_id_is_parse_error() {
        let api = ScriptedApi::new().with_submit(ApiResponse::new(201, r#"{"ok": true}"#));
        let target = parse_target("eloy.simoesjr").expect("valid");

        let result = submit(&api, &credential(), &target).await;
        assert!(matches!(result, Err(ClientError::Parse(_))));
    }
}
