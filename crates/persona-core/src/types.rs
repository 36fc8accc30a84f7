//! Shared types used across Persona.
//!
//! This module defines the newtypes passed between the credential store,
//! the lookup client, and the poll loop.

use crate::error::PersonaError;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::OnceLock;
use zeroize::Zeroizing;

/// Number of trailing characters left visible by [`Credential::masked`].
const VISIBLE_SUFFIX: usize = 5;

/// The API key presented to the remote service.
///
/// The secret is zeroized on drop and never appears in `Debug` output.
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    /// Wrap a raw API key.
    ///
    /// Surrounding whitespace (e.g. a trailing newline from a prompt) is
    /// stripped.
    ///
    /// # Errors
    /// Returns `PersonaError::Validation` if the key is empty.
    pub fn new(secret: impl Into<String>) -> Result<Self, PersonaError> {
        let secret = Zeroizing::new(secret.into());
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return Err(PersonaError::Validation(
                "credential must not be empty".to_string(),
            ));
        }
        Ok(Self(Zeroizing::new(trimmed.to_string())))
    }

    /// Access the raw secret, e.g. to place it in a request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked form for display: every character but the last five is `*`.
    ///
    /// Keys of five characters or fewer are masked entirely.
    #[must_use]
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= VISIBLE_SUFFIX {
            return "*".repeat(chars.len());
        }
        let hidden = chars.len() - VISIBLE_SUFFIX;
        let suffix: String = chars[hidden..].iter().collect();
        format!("{}{suffix}", "*".repeat(hidden))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Credential {}

/// Identifier of the analysis target (a numeric account id or a username).
///
/// Construction validates the syntax, so a `TargetIdentifier` can always be
/// submitted without another check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TargetIdentifier(String);

impl TargetIdentifier {
    /// Create a new `TargetIdentifier` from a string.
    ///
    /// # Errors
    /// Returns `PersonaError::InvalidIdentifier` if the syntax check fails.
    pub fn new(id: impl Into<String>) -> Result<Self, PersonaError> {
        let id = id.into();
        if Self::is_valid_syntax(&id) {
            Ok(Self(id))
        } else {
            Err(PersonaError::InvalidIdentifier(format!(
                "expected a numeric ID or a username of letters, digits, '.', '_' or '-', got '{id}'"
            )))
        }
    }

    /// Pure syntax check: all digits, or a username of ASCII letters,
    /// digits, dots, underscores and hyphens. Empty strings are rejected.
    #[must_use]
    pub fn is_valid_syntax(id: &str) -> bool {
        static NUMERIC_REGEX: OnceLock<Regex> = OnceLock::new();
        static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();

        let numeric = NUMERIC_REGEX.get_or_init(|| Regex::new(r"^[0-9]+$").expect("valid regex"));
        let username = USERNAME_REGEX
            .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("valid regex"));

        numeric.is_match(id) || username.is_match(id)
    }

    /// Whether this identifier is the numeric form.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.0.bytes().all(|b| b.is_ascii_digit())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque job identifier assigned by the remote service.
///
/// The service may send the id as a JSON number or a string; both decode to
/// the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobId(String);

impl JobId {
    /// Wrap a job id received from the service.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Ok(Self(n.to_string())),
            RawId::Text(s) if s.is_empty() => {
                Err(serde::de::Error::custom("job id must not be empty"))
            }
            RawId::Text(s) => Ok(Self(s)),
        }
    }
}
