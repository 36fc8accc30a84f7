//! Persona Vault - Encrypted API credential storage.
//!
//! Stores the single service credential encrypted at rest with
//! ChaCha20-Poly1305 under a locally generated random key.
//!
//! # Security Model
//!
//! - Random 256-bit key in a key file, generated on first store
//! - ChaCha20-Poly1305 AEAD with a random nonce per write
//! - The credential envelope records the id of the key that sealed it
//! - Key material and plaintext are zeroized when dropped
//! - The credential is never logged or included in error messages
//!
//! # Example
//!
//! ```ignore
//! use persona_vault::{CredentialRepository, FileCredentialStore};
//!
//! let store = FileCredentialStore::new("/path/to/persona");
//! store.store(&credential).await?;
//!
//! let loaded = store.load().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cipher;
pub mod error;
pub mod key;
pub mod memory;
pub mod store;

pub use cipher::SealedCredential;
pub use error::{Result, VaultError};
pub use key::SecretKey;
pub use memory::MemoryCredentialStore;
pub use store::{CredentialRepository, FileCredentialStore, CREDENTIAL_FILE_NAME, KEY_FILE_NAME};
