//! Poll loop driving a submitted lookup job to a terminal state.
//!
//! The service is polled at a fixed interval until it reports `FINISHED`
//! or answers 404. Transient failures back off exponentially up to a cap.
//! The loop is bounded by both an attempt budget and a wall-clock
//! deadline, and can be cancelled at any await point.
//!
//! The service reports `FINISHED` before the full result is attached, so
//! a completed job is never read from the same response: the loop waits a
//! settle delay and re-queries exactly once. If that second answer still
//! lacks the result the job ends with `IncompleteResult` instead of being
//! polled again.

use crate::api::LookupApi;
use crate::error::{ClientError, Result};
use persona_core::{Credential, JobId, PollingConfig};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a lookup job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Accepted by the service, not yet polled
    Submitted,
    /// Still being processed
    InProgress,
    /// Processing complete
    Finished,
    /// The service does not know the job
    NotFound,
    /// Unrecoverable failure
    Error,
}

impl JobStatus {
    /// Map the service's status label. Anything other than `FINISHED`
    /// means the job is still running.
    #[must_use]
    pub fn from_remote(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("FINISHED") {
            Self::Finished
        } else {
            Self::InProgress
        }
    }

    /// Whether polling stops in this state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::NotFound | Self::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Submitted => "SUBMITTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Finished => "FINISHED",
            Self::NotFound => "NOT_FOUND",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// A submitted job and the last status observed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupJob {
    id: JobId,
    status: JobStatus,
}

impl LookupJob {
    /// A freshly submitted job.
    #[must_use]
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Submitted,
        }
    }

    /// Job identifier.
    #[must_use]
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Last observed status.
    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Record a newly observed status. Terminal states are final.
    pub fn observe(&mut self, next: JobStatus) {
        if self.status.is_terminal() || self.status == next {
            return;
        }
        tracing::debug!("Lookup {}: {} -> {}", self.id, self.status, next);
        self.status = next;
    }

    /// Record the outcome of the settle re-fetch, which may overturn an
    /// earlier `Finished`.
    fn conclude(&mut self, outcome: JobStatus) {
        if self.status != outcome {
            tracing::debug!("Lookup {}: {} -> {}", self.id, self.status, outcome);
            self.status = outcome;
        }
    }
}

/// Timing and budget for [`PollLoop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Pause between status checks
    pub interval: Duration,
    /// Pause between the first `FINISHED` and the final retrieval
    pub settle_delay: Duration,
    /// Maximum number of status checks before giving up
    pub max_attempts: u32,
    /// Wall-clock budget for reaching `FINISHED`
    pub timeout: Duration,
    /// Upper bound for the backoff after transient failures
    pub max_backoff: Duration,
}

impl From<&PollingConfig> for PollSettings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            settle_delay: config.settle_delay(),
            max_attempts: config.max_attempts,
            timeout: config.timeout(),
            max_backoff: config.max_backoff(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl PollSettings {
    /// Pause before the next check after `failures` consecutive transient
    /// failures: the plain interval, doubled per failure, capped at
    /// `max_backoff` (never below the interval).
    #[must_use]
    pub fn delay_after(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.interval;
        }
        let factor = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
        self.interval
            .saturating_mul(factor)
            .min(self.max_backoff)
            .max(self.interval)
    }
}

/// Terminal payload returned by the settle re-fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    /// Job the payload belongs to
    pub job_id: JobId,
    /// Decoded response body
    pub body: serde_json::Value,
}

impl RawPayload {
    /// Normalize into a [`ProfileRecord`](crate::ProfileRecord).
    pub fn normalize(&self) -> Result<crate::ProfileRecord> {
        crate::assemble::normalize(&self.body)
    }
}

/// Just enough of the status body to read the job state.
#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    data: Vec<StatusRecord>,
}

#[derive(Debug, Deserialize)]
struct StatusRecord {
    status: String,
    #[serde(rename = "psychAnalyst", default)]
    psych_analyst: Option<serde_json::Value>,
}

/// What one status check told us.
enum Observation {
    Status(JobStatus),
    NoData,
    NotFound,
    Transient(ClientError),
}

/// Why a pause ended early.
enum Interrupt {
    Deadline,
    Cancelled,
}

/// Counters reported in `PollTimeout`.
struct Progress {
    started: Instant,
    attempts: u32,
    failures: u32,
    last_error: Option<String>,
}

impl Progress {
    fn timeout(&self, job_id: &JobId) -> ClientError {
        ClientError::PollTimeout {
            job_id: job_id.to_string(),
            attempts: self.attempts,
            elapsed_secs: self.started.elapsed().as_secs(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Polls one job until it finishes, fails, times out, or is cancelled.
pub struct PollLoop<'a, A: LookupApi + ?Sized> {
    api: &'a A,
    settings: PollSettings,
}

impl<'a, A: LookupApi + ?Sized> PollLoop<'a, A> {
    /// Create a loop over `api`.
    pub fn new(api: &'a A, settings: PollSettings) -> Self {
        Self { api, settings }
    }

    /// Drive `job` to completion and return the settled payload.
    ///
    /// `job` carries the last observed status out of the loop whether it
    /// ends in a payload or an error: `Finished` on success, `NotFound` or
    /// `Error` when the service ended the job, and the pre-exit state on
    /// timeout or cancellation.
    ///
    /// # Errors
    /// - `NotFound` on a 404 from any status check
    /// - `PollTimeout` when the attempt budget or the deadline runs out
    /// - `Cancelled` when `cancel` fires
    /// - `IncompleteResult` when the settle re-fetch carries no result
    pub async fn run(
        &self,
        credential: &Credential,
        job: &mut LookupJob,
        cancel: &CancellationToken,
    ) -> Result<RawPayload> {
        let job_id = &job.id().clone();
        let mut progress = Progress {
            started: Instant::now(),
            attempts: 0,
            failures: 0,
            last_error: None,
        };
        let deadline = instant_after(progress.started, self.settings.timeout);

        loop {
            if progress.attempts >= self.settings.max_attempts {
                return Err(progress.timeout(job_id));
            }

            let delay = self.settings.delay_after(progress.failures);
            match pause(delay, Some(deadline), cancel).await {
                Ok(()) => {}
                Err(Interrupt::Deadline) => return Err(progress.timeout(job_id)),
                Err(Interrupt::Cancelled) => return Err(cancelled(job_id)),
            }

            progress.attempts += 1;
            tracing::info!(
                "Attempt {} to check status of lookup {}",
                progress.attempts,
                job_id
            );

            match self.check(credential, job_id, deadline, cancel).await? {
                Observation::Status(status) => {
                    progress.failures = 0;
                    job.observe(status);
                    if status == JobStatus::Finished {
                        break;
                    }
                }
                Observation::NoData => {
                    progress.failures = 0;
                    tracing::debug!("Lookup {} has no status record yet", job_id);
                }
                Observation::NotFound => {
                    job.observe(JobStatus::NotFound);
                    return Err(ClientError::NotFound {
                        job_id: job_id.to_string(),
                    });
                }
                Observation::Transient(e) => {
                    progress.failures = progress.failures.saturating_add(1);
                    tracing::warn!(
                        "Status check {} for lookup {} failed, backing off: {}",
                        progress.attempts,
                        job_id,
                        e
                    );
                    progress.last_error = Some(e.to_string());
                }
            }
        }

        tracing::info!(
            "Lookup {} finished, waiting {:?} before final retrieval",
            job_id,
            self.settings.settle_delay
        );
        if pause(self.settings.settle_delay, None, cancel).await.is_err() {
            return Err(cancelled(job_id));
        }

        let payload = self.settle_fetch(credential, job_id, cancel).await;
        match &payload {
            Err(ClientError::NotFound { .. }) => job.conclude(JobStatus::NotFound),
            Err(ClientError::IncompleteResult { .. }) => job.conclude(JobStatus::Error),
            _ => {}
        }
        payload
    }

    /// One status check, bounded by the deadline and the cancel token.
    async fn check(
        &self,
        credential: &Credential,
        job_id: &JobId,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Observation> {
        let request = tokio::time::timeout_at(deadline, self.api.job_status(job_id, credential));
        let outcome = tokio::select! {
            () = cancel.cancelled() => return Err(cancelled(job_id)),
            outcome = request => outcome,
        };

        let response = match outcome {
            Err(_elapsed) => {
                return Ok(Observation::Transient(ClientError::TransientPoll {
                    status: None,
                    message: "status check overran the poll deadline".to_string(),
                }))
            }
            Ok(Err(e)) if e.is_transient() => return Ok(Observation::Transient(e)),
            Ok(Err(e)) => return Err(e),
            Ok(Ok(response)) => response,
        };

        match response.status {
            200 => match response.json::<StatusEnvelope>() {
                Ok(envelope) => Ok(envelope.data.first().map_or(Observation::NoData, |record| {
                    Observation::Status(JobStatus::from_remote(&record.status))
                })),
                Err(e) => Ok(Observation::Transient(e)),
            },
            404 => Ok(Observation::NotFound),
            status => Ok(Observation::Transient(ClientError::TransientPoll {
                status: Some(status),
                message: response.body,
            })),
        }
    }

    /// The single retrieval after the settle delay.
    async fn settle_fetch(
        &self,
        credential: &Credential,
        job_id: &JobId,
        cancel: &CancellationToken,
    ) -> Result<RawPayload> {
        let incomplete = |reason: String| ClientError::IncompleteResult {
            job_id: job_id.to_string(),
            reason,
        };

        let outcome = tokio::select! {
            () = cancel.cancelled() => return Err(cancelled(job_id)),
            outcome = self.api.job_status(job_id, credential) => outcome,
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) if e.is_transient() => return Err(incomplete(e.to_string())),
            Err(e) => return Err(e),
        };

        match response.status {
            200 => {}
            404 => {
                return Err(ClientError::NotFound {
                    job_id: job_id.to_string(),
                })
            }
            status => return Err(incomplete(format!("final retrieval returned status {status}"))),
        }

        let envelope: StatusEnvelope = response
            .json()
            .map_err(|e| incomplete(e.to_string()))?;
        let has_result = envelope
            .data
            .first()
            .and_then(|record| record.psych_analyst.as_ref())
            .is_some_and(|analyst| !analyst.is_null());
        if !has_result {
            return Err(incomplete("no result data in final retrieval".to_string()));
        }

        let body = serde_json::from_str(&response.body)?;
        tracing::info!("Lookup {} result retrieved", job_id);
        Ok(RawPayload {
            job_id: job_id.clone(),
            body,
        })
    }
}

fn cancelled(job_id: &JobId) -> ClientError {
    ClientError::Cancelled {
        job_id: job_id.to_string(),
    }
}

/// Far enough ahead to never be reached, small enough to stay representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + delay`, clamped to a far-future instant instead of overflowing.
fn instant_after(start: Instant, delay: Duration) -> Instant {
    start
        .checked_add(delay)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// Sleep for `delay` unless the deadline would pass first or `cancel`
/// fires.
async fn pause(
    delay: Duration,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
) -> std::result::Result<(), Interrupt> {
    let wake = instant_after(Instant::now(), delay);
    if deadline.is_some_and(|deadline| wake > deadline) {
        return Err(Interrupt::Deadline);
    }
    tokio::select! {
        () = cancel.cancelled() => Err(Interrupt::Cancelled),
        () = tokio::time::sleep_until(wake) => Ok(()),
    }
}
