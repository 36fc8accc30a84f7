//! Result normalization.
//!
//! Decodes the terminal payload into typed schema structs and flattens the
//! first profile into a [`ProfileRecord`]. Missing leaf fields fall back to
//! display defaults; a missing or empty container (`data`, `psychAnalyst`,
//! `profiles`) is a `Parse` error.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};

/// Placeholder for a missing person name.
pub const NAME_NOT_AVAILABLE: &str = "Name not available";

/// Placeholder for any other missing text field.
pub const NO_DATA_AVAILABLE: &str = "No data available";

/// Normalized profile handed to renderers and exporters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    /// Display name of the subject
    pub person_name: String,
    /// Free-text psychological portrait
    pub psychological_portrait: String,
    /// Leading part of the danger assessment (before the first comma)
    pub danger_severity: String,
    /// Remainder of the danger assessment, empty if there was none
    pub danger_detail: String,
    /// Predicted traits, in service order
    pub predicted_characteristics: Vec<String>,
    /// Profile picture, if the service supplied one
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    data: Vec<DataRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataRecord {
    #[serde(default)]
    psych_analyst: Option<PsychAnalyst>,
}

#[derive(Debug, Deserialize)]
struct PsychAnalyst {
    #[serde(default)]
    profiles: Option<Vec<RawProfile>>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProfile {
    person_name: Option<String>,
    psychological_portrait: Option<String>,
    level_of_danger: Option<String>,
    predicted_characteristics: Option<Vec<String>>,
}

/// Split a danger assessment on its first comma.
///
/// Both halves are trimmed; without a comma the detail is empty.
#[must_use]
pub fn split_danger(raw: &str) -> (String, String) {
    match raw.split_once(',') {
        Some((severity, detail)) => (severity.trim().to_string(), detail.trim().to_string()),
        None => (raw.trim().to_string(), String::new()),
    }
}

/// Normalize a terminal payload (`data[0].psychAnalyst.profiles[0]`).
///
/// # Errors
/// Returns `ClientError::Parse` when the payload does not have the
/// expected structure.
pub fn normalize(payload: &serde_json::Value) -> Result<ProfileRecord> {
    let payload = Payload::deserialize(payload)
        .map_err(|e| ClientError::Parse(format!("unexpected result payload: {e}")))?;

    let record = payload
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::Parse("result payload has no data records".to_string()))?;
    let analyst = record
        .psych_analyst
        .ok_or_else(|| ClientError::Parse("result record has no psychAnalyst".to_string()))?;
    let profile = analyst
        .profiles
        .and_then(|profiles| profiles.into_iter().next())
        .ok_or_else(|| ClientError::Parse("psychAnalyst has no profiles".to_string()))?;

    let text = |field: Option<String>, default: &str| {
        field
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    let danger = text(profile.level_of_danger, NO_DATA_AVAILABLE);
    let (danger_severity, danger_detail) = split_danger(&danger);

    Ok(ProfileRecord {
        person_name: text(profile.person_name, NAME_NOT_AVAILABLE),
        psychological_portrait: text(profile.psychological_portrait, NO_DATA_AVAILABLE),
        danger_severity,
        danger_detail,
        predicted_characteristics: profile.predicted_characteristics.unwrap_or_default(),
        image_url: analyst.image.filter(|url| !url.trim().is_empty()),
    })
}
