//! End-to-end lookup pipeline.
//!
//! Ties the credential repository to the remote service: establish a
//! validated credential, submit a target, poll it to completion, and
//! normalize the result.

use crate::account::{validate_credential, AccountInfo};
use crate::api::LookupApi;
use crate::assemble::ProfileRecord;
use crate::error::{ClientError, Result};
use crate::lookup::{parse_target, submit};
use crate::poll::{LookupJob, PollLoop, PollSettings};
use futures::stream::{FuturesUnordered, StreamExt};
use persona_core::Credential;
use persona_vault::CredentialRepository;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A credential that the service has just accepted.
#[derive(Debug, Clone)]
pub struct Session {
    /// The accepted credential
    pub credential: Credential,
    /// Account status returned by the check
    pub account: AccountInfo,
}

/// Outcome of one target in [`LookupPipeline::run_many`].
#[derive(Debug)]
pub struct LookupOutcome {
    /// Target as supplied by the caller
    pub target: String,
    /// Normalized profile or the error that ended this lookup
    pub result: Result<ProfileRecord>,
}

/// Runs lookups against a service using a stored credential.
pub struct LookupPipeline<A: ?Sized, S: ?Sized> {
    api: Arc<A>,
    store: Arc<S>,
    settings: PollSettings,
}

impl<A, S> LookupPipeline<A, S>
where
    A: LookupApi + ?Sized,
    S: CredentialRepository + ?Sized,
{
    /// Create a pipeline.
    pub fn new(api: Arc<A>, store: Arc<S>, settings: PollSettings) -> Self {
        Self {
            api,
            store,
            settings,
        }
    }

    /// Obtain a credential the service accepts.
    ///
    /// A `supplied` credential is validated and, if accepted, stored
    /// (replacing any previous one). Without one the stored credential is
    /// loaded and re-validated.
    ///
    /// # Errors
    /// - `Auth` if the service rejects the credential
    /// - `NoCredential` if none was supplied and none is stored
    /// - `Vault` if the stored credential cannot be read or written
    pub async fn establish_credential(&self, supplied: Option<Credential>) -> Result<Session> {
        if let Some(credential) = supplied {
            let account = validate_credential(self.api.as_ref(), &credential)
                .await?
                .ok_or_else(|| {
                    ClientError::Auth(format!(
                        "API key {} was rejected by the service",
                        credential.masked()
                    ))
                })?;
            self.store.store(&credential).await?;
            tracing::info!("API key {} validated and saved", credential.masked());
            return Ok(Session {
                credential,
                account,
            });
        }

        let credential = self.store.load().await?.ok_or(ClientError::NoCredential)?;
        let account = validate_credential(self.api.as_ref(), &credential)
            .await?
            .ok_or_else(|| {
                ClientError::Auth(format!(
                    "stored API key {} is no longer valid; supply a new one",
                    credential.masked()
                ))
            })?;
        tracing::debug!("Using stored API key {}", credential.masked());
        Ok(Session {
            credential,
            account,
        })
    }

    /// Fetch current account status for `credential`.
    ///
    /// # Errors
    /// Returns `Auth` if the service rejects the credential.
    pub async fn account_info(&self, credential: &Credential) -> Result<AccountInfo> {
        validate_credential(self.api.as_ref(), credential)
            .await?
            .ok_or_else(|| {
                ClientError::Auth(format!(
                    "unable to fetch account information for API key {}",
                    credential.masked()
                ))
            })
    }

    /// Look up one target from submission to normalized record.
    ///
    /// The target is checked before any request is made.
    pub async fn run_lookup(
        &self,
        credential: &Credential,
        raw_target: &str,
        cancel: &CancellationToken,
    ) -> Result<ProfileRecord> {
        let target = parse_target(raw_target)?;
        let job_id = submit(self.api.as_ref(), credential, &target).await?;

        let mut job = LookupJob::new(job_id);
        let poll = PollLoop::new(self.api.as_ref(), self.settings.clone());
        let payload = match poll.run(credential, &mut job, cancel).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(
                    "Lookup {} for {} stopped with job status {:?}",
                    job.id(),
                    target,
                    job.status()
                );
                return Err(e);
            }
        };

        let record = payload.normalize()?;
        tracing::info!("Profile for {} assembled", target);
        Ok(record)
    }

    /// Look up several targets concurrently.
    ///
    /// Each lookup runs under its own child of `cancel`, so cancelling the
    /// parent stops all of them. Failures are reported per target; outcomes
    /// come back in input order.
    pub async fn run_many(
        &self,
        credential: &Credential,
        targets: &[String],
        cancel: &CancellationToken,
    ) -> Vec<LookupOutcome> {
        let mut pending = FuturesUnordered::new();
        for (index, target) in targets.iter().enumerate() {
            let child = cancel.child_token();
            pending.push(async move {
                let result = self.run_lookup(credential, target, &child).await;
                (index, result)
            });
        }

        let mut outcomes: Vec<Option<LookupOutcome>> = targets.iter().map(|_| None).collect();
        while let Some((index, result)) = pending.next().await {
            if let Err(e) = &result {
                tracing::warn!("Lookup for {} failed: {}", targets[index], e);
            }
            outcomes[index] = Some(LookupOutcome {
                target: targets[index].clone(),
                result,
            });
        }

        outcomes.into_iter().flatten().collect()
    }
}
