//! Persona Client - asynchronous lookup job client.
//!
//! Drives one lookup through the remote analysis service:
//!
//! ```text
//! credential ─▶ validate ─▶ submit(target) ─▶ poll until FINISHED
//!                                                 │ settle delay
//!                                                 ▼
//!                 ProfileRecord ◀─ normalize ◀─ re-fetch once
//! ```
//!
//! The service is reached through the [`LookupApi`] trait; [`HttpLookupApi`]
//! is the `reqwest` implementation. The credential comes from any
//! [`persona_vault::CredentialRepository`].
//!
//! # Example
//!
//! ```ignore
//! use persona_client::{HttpLookupApi, LookupPipeline, PollSettings};
//! use persona_vault::FileCredentialStore;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let api = Arc::new(HttpLookupApi::new(&config.service)?);
//! let store = Arc::new(FileCredentialStore::new(config.credential_dir()?));
//! let pipeline = LookupPipeline::new(api, store, PollSettings::from(&config.polling));
//!
//! let session = pipeline.establish_credential(None).await?;
//! let record = pipeline
//!     .run_lookup(&session.credential, "100077649716158", &CancellationToken::new())
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod account;
pub mod api;
pub mod assemble;
pub mod error;
pub mod http;
pub mod lookup;
pub mod pipeline;
pub mod poll;

#[cfg(test)]
pub(crate) mod testing;

pub use account::{validate_credential, AccountInfo};
pub use api::{ApiResponse, LookupApi, SubmitRequest, LOOKUP_ID, LOOKUP_TYPE};
pub use assemble::{normalize, split_danger, ProfileRecord};
pub use error::{ClientError, Result};
pub use http::HttpLookupApi;
pub use lookup::{parse_target, submit, validate_identifier_syntax};
pub use pipeline::{LookupOutcome, LookupPipeline, Session};
pub use poll::{JobStatus, LookupJob, PollLoop, PollSettings, RawPayload};
