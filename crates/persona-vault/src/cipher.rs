//! Credential sealing using ChaCha20-Poly1305 AEAD.
//!
//! # Security Properties
//!
//! - **Confidentiality**: `ChaCha20` stream cipher
//! - **Authenticity**: `Poly1305` MAC, with the key id bound as associated data
//! - **Nonce**: 96-bit random nonce per encryption
//!
//! Sealing the same credential twice yields different ciphertexts; both
//! open to the same value.

use crate::error::{Result, VaultError};
use crate::key::SecretKey;
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    ChaCha20Poly1305, Nonce,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Length of the nonce in bytes (96 bits for ChaCha20-Poly1305).
pub const NONCE_LENGTH: usize = 12;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// On-disk envelope of the encrypted credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedCredential {
    /// Envelope format version
    pub version: u8,
    /// Hex id of the key that sealed this credential
    pub key_id: String,
    /// Hex nonce
    nonce: String,
    /// Hex ciphertext + authentication tag
    ciphertext: String,
}

impl SealedCredential {
    /// Encrypt a credential string under `key`.
    ///
    /// # Errors
    /// Returns `VaultError::Encryption` if the AEAD operation fails.
    pub fn seal(plaintext: &str, key: &SecretKey) -> Result<Self> {
        let key_id = key.id_hex();
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let cipher = ChaCha20Poly1305::new(key.bytes().into());

        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: key_id.as_bytes(),
                },
            )
            .map_err(|e| VaultError::Encryption(format!("encryption failed: {e}")))?;

        Ok(Self {
            version: ENVELOPE_VERSION,
            key_id,
            nonce: hex::encode(nonce),
            ciphertext: hex::encode(ciphertext),
        })
    }

    /// Decrypt with `key`.
    ///
    /// # Errors
    /// - `VaultError::KeyMismatch` if the envelope names a different key id
    /// - `VaultError::InvalidData` if the envelope is malformed
    /// - `VaultError::Decryption` if authentication fails
    pub fn open(&self, key: &SecretKey) -> Result<Zeroizing<String>> {
        if self.version != ENVELOPE_VERSION {
            return Err(VaultError::InvalidData(format!(
                "unsupported credential envelope version {}",
                self.version
            )));
        }

        let found = key.id_hex();
        if self.key_id != found {
            return Err(VaultError::KeyMismatch {
                expected: self.key_id.clone(),
                found,
            });
        }

        let nonce_bytes = hex::decode(&self.nonce)
            .map_err(|e| VaultError::InvalidData(format!("invalid nonce encoding: {e}")))?;
        if nonce_bytes.len() != NONCE_LENGTH {
            return Err(VaultError::InvalidData(format!(
                "invalid nonce: expected {NONCE_LENGTH} bytes, got {}",
                nonce_bytes.len()
            )));
        }
        let ciphertext = hex::decode(&self.ciphertext)
            .map_err(|e| VaultError::InvalidData(format!("invalid ciphertext encoding: {e}")))?;

        let cipher = ChaCha20Poly1305::new(key.bytes().into());
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(
                    Nonce::from_slice(&nonce_bytes),
                    Payload {
                        msg: &ciphertext,
                        aad: self.key_id.as_bytes(),
                    },
                )
                .map_err(|e| VaultError::Decryption(format!("decryption failed: {e}")))?,
        );

        let text = std::str::from_utf8(&plaintext)
            .map_err(|e| VaultError::Decryption(format!("credential is not UTF-8: {e}")))?;
        Ok(Zeroizing::new(text.to_string()))
    }

    /// Ciphertext as raw bytes (for comparisons in tests and diagnostics).
    ///
    /// # Errors
    /// Returns `VaultError::InvalidData` if the stored hex is malformed.
    pub fn ciphertext_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(&self.ciphertext)
            .map_err(|e| VaultError::InvalidData(format!("invalid ciphertext encoding: {e}")))
    }
}
