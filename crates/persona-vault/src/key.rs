//! Local symmetric key material.
//!
//! The key file holds a random 256-bit key plus a random 64-bit key id.
//! Every sealed credential records the id of the key that sealed it, so a
//! regenerated key is reported as a mismatch instead of an opaque AEAD
//! failure.
//!
//! # File Format
//!
//! ```text
//! magic "PKY1" (4 bytes) | key id (8 bytes) | key (32 bytes)
//! ```

use crate::error::{Result, VaultError};
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use zeroize::Zeroizing;

/// Length of the symmetric key in bytes (256 bits).
pub const KEY_LENGTH: usize = 32;

/// Length of the key id in bytes.
pub const KEY_ID_LENGTH: usize = 8;

const KEY_FILE_MAGIC: &[u8; 4] = b"PKY1";

/// Total size of a serialized key file.
pub const KEY_FILE_LENGTH: usize = KEY_FILE_MAGIC.len() + KEY_ID_LENGTH + KEY_LENGTH;

/// Symmetric key used to seal the credential. Zeroized on drop.
pub struct SecretKey {
    id: [u8; KEY_ID_LENGTH],
    bytes: Zeroizing<[u8; KEY_LENGTH]>,
}

impl SecretKey {
    /// Generate a fresh random key with a fresh id.
    #[must_use]
    pub fn generate() -> Self {
        let mut id = [0u8; KEY_ID_LENGTH];
        OsRng.fill_bytes(&mut id);

        let mut bytes = Zeroizing::new([0u8; KEY_LENGTH]);
        OsRng.fill_bytes(&mut bytes[..]);

        Self { id, bytes }
    }

    /// Build a key from known parts (tests and migrations).
    #[must_use]
    pub fn from_parts(id: [u8; KEY_ID_LENGTH], bytes: [u8; KEY_LENGTH]) -> Self {
        Self {
            id,
            bytes: Zeroizing::new(bytes),
        }
    }

    /// Key id as lowercase hex.
    #[must_use]
    pub fn id_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// Raw key bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.bytes
    }

    /// Serialize for the key file.
    #[must_use]
    pub fn to_file_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(KEY_FILE_LENGTH));
        out.extend_from_slice(KEY_FILE_MAGIC);
        out.extend_from_slice(&self.id);
        out.extend_from_slice(&self.bytes[..]);
        out
    }

    /// Parse the contents of a key file.
    ///
    /// # Errors
    /// Returns `VaultError::InvalidData` on a wrong length or magic.
    pub fn from_file_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != KEY_FILE_LENGTH {
            return Err(VaultError::InvalidData(format!(
                "invalid key file: expected {KEY_FILE_LENGTH} bytes, got {}",
                data.len()
            )));
        }

        let (magic, rest) = data.split_at(KEY_FILE_MAGIC.len());
        if magic != KEY_FILE_MAGIC {
            return Err(VaultError::InvalidData(
                "invalid key file: unrecognized header".to_string(),
            ));
        }

        let (id_bytes, key_bytes) = rest.split_at(KEY_ID_LENGTH);
        let mut id = [0u8; KEY_ID_LENGTH];
        id.copy_from_slice(id_bytes);
        let mut bytes = Zeroizing::new([0u8; KEY_LENGTH]);
        bytes.copy_from_slice(key_bytes);

        Ok(Self { id, bytes })
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("id", &self.id_hex())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique() {
        let key1 = SecretKey::generate();
        let key2 = SecretKey::generate();

        assert_ne!(key1.id_hex(), key2.id_hex());
        assert_ne!(key1.bytes(), key2.bytes());
    }

    #[test]
    fn test_file_roundtrip() {
        let key = SecretKey::generate();
        let encoded = key.to_file_bytes();
        assert_eq!(encoded.len(), KEY_FILE_LENGTH);

        let decoded = SecretKey::from_file_bytes(&encoded).expect("decode key");
        assert_eq!(decoded.id_hex(), key.id_hex());
        assert_eq!(decoded.bytes(), key.bytes());
    }

    #[test]
    fn test_truncated_file_rejected() {
        let key = SecretKey::generate();
        let encoded = key.to_file_bytes();

        let result = SecretKey::from_file_bytes(&encoded[..KEY_FILE_LENGTH - 1]);
        assert!(matches!(result, Err(VaultError::InvalidData(_))));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut encoded = SecretKey::generate().to_file_bytes().to_vec();
        encoded[0] = b'X';

        let result = SecretKey::from_file_bytes(&encoded);
        assert!(matches!(result, Err(VaultError::InvalidData(msg)) if msg.contains("header")));
    }

    #[test]
    fn test_debug_hides_key_bytes() {
        let key = SecretKey::from_parts([1; KEY_ID_LENGTH], [0x42; KEY_LENGTH]);
        let debug = format!("{key:?}");
        assert!(debug.contains("0101010101010101"));
        assert!(!debug.contains("42, 42"));
    }
}
