//! Credential validation against the remote account endpoint.

use crate::api::LookupApi;
use crate::error::Result;
use chrono::{DateTime, Utc};
use persona_core::Credential;
use serde::{Deserialize, Serialize};

/// Account status returned by the credit check. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Remaining balance
    pub balance: f64,
    /// Currency of `balance`
    pub currency: String,
    /// Remaining lookup credits
    pub credits: f64,
    /// When the subscription expires
    #[serde(rename = "expiratioDate", alias = "expirationDate")]
    pub expiration: DateTime<Utc>,
    /// Account status label
    pub status: String,
}

/// Check `credential` against the account endpoint.
///
/// Returns `Ok(None)` for any non-200 answer and for transport failures;
/// the caller decides whether that means a rejected key. A 200 whose body
/// does not decode is a `Parse` error.
pub async fn validate_credential<A>(api: &A, credential: &Credential) -> Result<Option<AccountInfo>>
where
    A: LookupApi + ?Sized,
{
    tracing::debug!("Validating credential {}", credential.masked());

    let response = match api.credit_stat(credential).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Credential check failed: {}", e);
            return Ok(None);
        }
    };

    if response.status != 200 {
        tracing::warn!(
            "Credential {} rejected: status {}",
            credential.masked(),
            response.status
        );
        return Ok(None);
    }

    let info: AccountInfo = response.json()?;
    tracing::info!("Credential validated, account status {}", info.status);
    Ok(Some(info))
}
