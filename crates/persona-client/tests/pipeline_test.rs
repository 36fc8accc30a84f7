//! Integration tests for the lookup pipeline over a file-backed credential
//! store and an in-process fake service.

use async_trait::async_trait;
use persona_client::{
    ApiResponse, ClientError, LookupApi, LookupPipeline, PollSettings, SubmitRequest,
};
use persona_core::{Credential, JobId};
use persona_vault::{CredentialRepository, FileCredentialStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const VALID_KEY: &str = "integration-key-31337";

const ACCOUNT_BODY: &str = r#"{"balance": 99.5, "currency": "EUR", "credits": 250,
    "expiratioDate": "2027-06-30T23:59:59.000Z", "status": "ACTIVE"}"#;

/// Accepts one key; finishes every job on its second status check.
#[derive(Default)]
struct FakeService {
    status_calls: AtomicUsize,
    finish_after: usize,
}

impl FakeService {
    fn finishing_after(polls: usize) -> Self {
        Self {
            finish_after: polls,
            ..Self::default()
        }
    }
}

#[async_trait]
impl LookupApi for FakeService {
    async fn credit_stat(&self, credential: &Credential) -> persona_client::Result<ApiResponse> {
        if credential.expose() == VALID_KEY {
            Ok(ApiResponse::new(200, ACCOUNT_BODY))
        } else {
            Ok(ApiResponse::new(401, "invalid key"))
        }
    }

    async fn submit(&self, request: &SubmitRequest<'_>) -> persona_client::Result<ApiResponse> {
        let body = serde_json::to_value(request)?;
        if body["key"] != VALID_KEY {
            return Ok(ApiResponse::new(401, "invalid key"));
        }
        if body["value"] == "missing.person" {
            return Ok(ApiResponse::new(201, r#"{"id": "404"}"#));
        }
        Ok(ApiResponse::new(201, r#"{"id": 5150}"#))
    }

    async fn job_status(
        &self,
        job_id: &JobId,
        _credential: &Credential,
    ) -> persona_client::Result<ApiResponse> {
        let call = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if job_id.as_str() == "404" {
            return Ok(ApiResponse::new(404, "Not Found"));
        }
        let body = if call < self.finish_after {
            r#"{"data": [{"status": "IN_PROGRESS"}]}"#.to_string()
        } else if call == self.finish_after {
            r#"{"data": [{"status": "FINISHED"}]}"#.to_string()
        } else {
            serde_json::json!({
                "data": [{
                    "status": "FINISHED",
                    "psychAnalyst": {
                        "image": "",
                        "profiles": [{
                            "personName": "Test Subject",
                            "levelOfDanger": "High, subject exhibits aggressive tendencies",
                            "predictedCharacteristics": ["impulsive", "persistent"]
                        }]
                    }
                }]
            })
            .to_string()
        };
        Ok(ApiResponse::new(200, body))
    }
}

fn fast_settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(10),
        settle_delay: Duration::from_millis(20),
        max_attempts: 20,
        timeout: Duration::from_secs(5),
        max_backoff: Duration::from_millis(50),
    }
}

fn credential(value: &str) -> Credential {
    Credential::new(value).expect("valid credential")
}

#[tokio::test]
async fn test_first_run_stores_key_and_second_run_reuses_it() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let store = Arc::new(FileCredentialStore::new(temp_dir.path()));
    let pipeline = LookupPipeline::new(
        Arc::new(FakeService::finishing_after(2)),
        Arc::clone(&store),
        fast_settings(),
    );

    let first = pipeline
        .establish_credential(Some(credential(VALID_KEY)))
        .await
        .expect("first session");
    assert_eq!(first.account.currency, "EUR");
    assert!(store.credential_path().exists());
    assert!(store.key_path().exists());

    // A fresh pipeline over the same directory picks the stored key up
    let reopened = LookupPipeline::new(
        Arc::new(FakeService::finishing_after(2)),
        Arc::new(FileCredentialStore::new(temp_dir.path())),
        fast_settings(),
    );
    let second = reopened.establish_credential(None).await.expect("second session");
    assert_eq!(second.credential, credential(VALID_KEY));
}

#[tokio::test]
async fn test_rejected_key_leaves_no_files() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let store = Arc::new(FileCredentialStore::new(temp_dir.path()));
    let pipeline = LookupPipeline::new(
        Arc::new(FakeService::finishing_after(1)),
        Arc::clone(&store),
        fast_settings(),
    );

    let result = pipeline
        .establish_credential(Some(credential("not-the-right-key")))
        .await;

    assert!(matches!(result, Err(ClientError::Auth(_))));
    assert!(store.load().await.expect("load").is_none());
    assert!(!store.credential_path().exists());
}

#[tokio::test]
async fn test_lookup_produces_normalized_record() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let service = Arc::new(FakeService::finishing_after(3));
    let pipeline = LookupPipeline::new(
        Arc::clone(&service),
        Arc::new(FileCredentialStore::new(temp_dir.path())),
        fast_settings(),
    );

    let session = pipeline
        .establish_credential(Some(credential(VALID_KEY)))
        .await
        .expect("session");
    let record = pipeline
        .run_lookup(
            &session.credential,
            "100077649716158",
            &CancellationToken::new(),
        )
        .await
        .expect("record");

    assert_eq!(record.person_name, "Test Subject");
    assert_eq!(record.psychological_portrait, "No data available");
    assert_eq!(record.danger_severity, "High");
    assert_eq!(record.danger_detail, "subject exhibits aggressive tendencies");
    assert_eq!(record.predicted_characteristics, vec!["impulsive", "persistent"]);
    assert!(record.image_url.is_none());
    // Three polls plus the single settle re-fetch
    assert_eq!(service.status_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_unknown_job_surfaces_not_found() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let pipeline = LookupPipeline::new(
        Arc::new(FakeService::finishing_after(1)),
        Arc::new(FileCredentialStore::new(temp_dir.path())),
        fast_settings(),
    );

    let result = pipeline
        .run_lookup(
            &credential(VALID_KEY),
            "missing.person",
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(ClientError::NotFound { job_id }) if job_id == "404"));
}

#[tokio::test]
async fn test_submission_with_rejected_key_fails() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let pipeline = LookupPipeline::new(
        Arc::new(FakeService::finishing_after(1)),
        Arc::new(FileCredentialStore::new(temp_dir.path())),
        fast_settings(),
    );

    let result = pipeline
        .run_lookup(
            &credential("revoked-key-00000"),
            "eloy.simoesjr",
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(ClientError::Submission { status: 401, .. })
    ));
}
