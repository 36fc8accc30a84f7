//! Scripted [`LookupApi`] used by the unit tests.

use crate::api::{ApiResponse, LookupApi, SubmitRequest};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use persona_core::{Credential, JobId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One scripted reply: a response or a transport failure.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Reply(ApiResponse),
    Fail(String),
    /// Never answers
    Stall,
}

impl Step {
    fn into_result(self) -> Result<ApiResponse> {
        match self {
            Self::Reply(response) => Ok(response),
            Self::Fail(message) => Err(ClientError::TransientPoll {
                status: None,
                message,
            }),
            Self::Stall => unreachable!("stalled steps are awaited, not converted"),
        }
    }
}

/// Replays canned responses in order and counts calls per endpoint.
///
/// Once the status script runs dry the `repeat` step (if any) answers every
/// further status check; without one the test panics.
#[derive(Debug, Default)]
pub(crate) struct ScriptedApi {
    credit: Mutex<Option<Step>>,
    submits: Mutex<VecDeque<Step>>,
    statuses: Mutex<VecDeque<Step>>,
    repeat: Mutex<Option<Step>>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    submitted_values: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_credit_stat(self, response: ApiResponse) -> Self {
        *self.credit.lock().expect("lock") = Some(Step::Reply(response));
        self
    }

    pub(crate) fn with_credit_stat_error(self, message: &str) -> Self {
        *self.credit.lock().expect("lock") = Some(Step::Fail(message.to_string()));
        self
    }

    pub(crate) fn with_submit(self, response: ApiResponse) -> Self {
        self.submits
            .lock()
            .expect("lock")
            .push_back(Step::Reply(response));
        self
    }

    pub(crate) fn with_status(self, response: ApiResponse) -> Self {
        self.statuses
            .lock()
            .expect("lock")
            .push_back(Step::Reply(response));
        self
    }

    pub(crate) fn with_status_error(self, message: &str) -> Self {
        self.statuses
            .lock()
            .expect("lock")
            .push_back(Step::Fail(message.to_string()));
        self
    }

    pub(crate) fn with_status_stall(self) -> Self {
        self.statuses.lock().expect("lock").push_back(Step::Stall);
        self
    }

    pub(crate) fn repeating(self, response: ApiResponse) -> Self {
        *self.repeat.lock().expect("lock") = Some(Step::Reply(response));
        self
    }

    pub(crate) fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn submitted_values(&self) -> Vec<String> {
        self.submitted_values.lock().expect("lock").clone()
    }
}

#[async_trait]
impl LookupApi for ScriptedApi {
    async fn credit_stat(&self, _credential: &Credential) -> Result<ApiResponse> {
        self.credit
            .lock()
            .expect("lock")
            .clone()
            .expect("no credit-stat response scripted")
            .into_result()
    }

    async fn submit(&self, request: &SubmitRequest<'_>) -> Result<ApiResponse> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted_values
            .lock()
            .expect("lock")
            .push(request.value().to_string());
        self.submits
            .lock()
            .expect("lock")
            .pop_front()
            .expect("no submit response scripted")
            .into_result()
    }

    async fn job_status(&self, _job_id: &JobId, _credential: &Credential) -> Result<ApiResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().expect("lock").pop_front();
        let step = next
            .or_else(|| self.repeat.lock().expect("lock").clone())
            .expect("status script exhausted");
        if matches!(step, Step::Stall) {
            std::future::pending::<()>().await;
        }
        step.into_result()
    }
}

/// Status body for a job still running.
pub(crate) fn in_progress() -> ApiResponse {
    ApiResponse::new(
        200,
        r#"{"data": [{"status": "IN_PROGRESS", "psychAnalyst": null}]}"#,
    )
}

/// Status body reporting completion before the result is attached.
pub(crate) fn finished_without_result() -> ApiResponse {
    ApiResponse::new(200, r#"{"data": [{"status": "FINISHED"}]}"#)
}

/// Complete terminal payload.
pub(crate) fn finished_with_result() -> ApiResponse {
    ApiResponse::new(200, FINISHED_BODY)
}

pub(crate) const FINISHED_BODY: &str = r#"{
    "data": [{
        "status": "FINISHED",
        "psychAnalyst": {
            "image": "https://cdn.example.com/p/42.jpg",
            "profiles": [{
                "personName": "Eloy Simoes",
                "psychologicalPortrait": "Outgoing and analytical.",
                "levelOfDanger": "Low, no concerning indicators",
                "predictedCharacteristics": ["curious", "organized"]
            }]
        }
    }]
}"#;
