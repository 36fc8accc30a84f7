//! Error types for the credential vault.

use thiserror::Error;

/// Errors that can occur while sealing, storing, or loading the credential.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Encryption operation failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption operation failed (corrupted or tampered ciphertext).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The stored credential was sealed under a different key than the one on disk.
    #[error("stored credential was encrypted with key {expected}, but the key file holds {found}; re-enter the API key")]
    KeyMismatch {
        /// Key id recorded in the credential file
        expected: String,
        /// Key id of the key file currently on disk
        found: String,
    },

    /// A credential exists but the key file it was sealed with is gone.
    #[error("key file missing at {0}; the stored credential can no longer be decrypted, re-enter the API key")]
    KeyMissing(String),

    /// Invalid key or credential file format.
    #[error("invalid vault data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Whether the stored credential is unreadable under the current key.
    ///
    /// Covers tampering, key regeneration and a vanished key file alike;
    /// the remedy in every case is to store the credential again.
    #[must_use]
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            Self::Decryption(_) | Self::KeyMismatch { .. } | Self::KeyMissing(_)
        )
    }
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
