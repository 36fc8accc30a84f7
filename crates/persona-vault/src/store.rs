//! Credential repositories.
//!
//! [`CredentialRepository`] is the seam the rest of the application talks
//! to. [`FileCredentialStore`] persists the credential as two files in one
//! directory: the key file and the sealed credential envelope.
//!
//! # Consistency
//!
//! - The key is generated only when `store` finds no key file. A corrupt
//!   key file is an error, never a reason to regenerate.
//! - `load` never creates a key. A credential without its key file is
//!   reported as `KeyMissing`; a credential sealed under another key as
//!   `KeyMismatch`.
//! - Both files are written via a temporary file and a rename, and stores
//!   within one process are serialized. Separate processes writing at the
//!   same time still race (last write wins).

use crate::cipher::SealedCredential;
use crate::error::{Result, VaultError};
use crate::key::SecretKey;
use async_trait::async_trait;
use persona_core::Credential;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Key file name inside the credential directory.
pub const KEY_FILE_NAME: &str = "secret.key";

/// Sealed credential file name inside the credential directory.
pub const CREDENTIAL_FILE_NAME: &str = "apikey.enc";

/// Load/store access to the single stored API credential.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Load the stored credential, or `None` if nothing is stored.
    ///
    /// # Errors
    /// Returns an error if a credential exists but cannot be decrypted.
    async fn load(&self) -> Result<Option<Credential>>;

    /// Store `credential`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if encryption or the filesystem write fails.
    async fn store(&self, credential: &Credential) -> Result<()>;
}

/// File-backed credential repository.
#[derive(Debug)]
pub struct FileCredentialStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Create a store rooted at `dir`. Nothing is touched until the first
    /// `load` or `store`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Directory holding both files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the key file.
    #[must_use]
    pub fn key_path(&self) -> PathBuf {
        self.dir.join(KEY_FILE_NAME)
    }

    /// Path of the sealed credential file.
    #[must_use]
    pub fn credential_path(&self) -> PathBuf {
        self.dir.join(CREDENTIAL_FILE_NAME)
    }

    async fn read_key(&self) -> Result<Option<SecretKey>> {
        match read_optional(&self.key_path()).await? {
            Some(bytes) => SecretKey::from_file_bytes(&bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn load_or_create_key(&self) -> Result<SecretKey> {
        if let Some(key) = self.read_key().await? {
            return Ok(key);
        }

        let key = SecretKey::generate();
        write_atomic(&self.key_path(), &key.to_file_bytes()).await?;
        tracing::info!(
            "Generated new credential key {} at {}",
            key.id_hex(),
            self.key_path().display()
        );
        Ok(key)
    }
}

#[async_trait]
impl CredentialRepository for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        let credential_path = self.credential_path();
        let Some(envelope) = read_optional(&credential_path).await? else {
            tracing::debug!("No stored credential at {}", credential_path.display());
            return Ok(None);
        };

        let key = self
            .read_key()
            .await?
            .ok_or_else(|| VaultError::KeyMissing(self.key_path().display().to_string()))?;

        let sealed: SealedCredential = serde_json::from_slice(&envelope).map_err(|e| {
            VaultError::InvalidData(format!("unreadable credential file: {e}"))
        })?;
        let plaintext = sealed.open(&key)?;

        let credential = Credential::new(plaintext.as_str())
            .map_err(|e| VaultError::InvalidData(format!("stored credential is invalid: {e}")))?;
        tracing::debug!("Loaded stored credential {}", credential.masked());
        Ok(Some(credential))
    }

    async fn store(&self, credential: &Credential) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.dir).await?;
        let key = self.load_or_create_key().await?;

        let sealed = SealedCredential::seal(credential.expose(), &key)?;
        let envelope = serde_json::to_vec_pretty(&sealed)?;
        write_atomic(&self.credential_path(), &envelope).await?;

        tracing::info!(
            "Stored credential {} under key {}",
            credential.masked(),
            key.id_hex()
        );
        Ok(())
    }
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `data` to a sibling temp file created owner-only, then rename it
/// over `path`.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp_name = path
        .file_name()
        .ok_or_else(|| VaultError::InvalidData(format!("not a file path: {}", path.display())))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    // A leftover from an interrupted write may carry wider permissions
    match tokio::fs::remove_file(&tmp_path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    let mut file = owner_only_options().open(&tmp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

/// Options for a fresh file readable and writable by the owner alone.
fn owner_only_options() -> tokio::fs::OpenOptions {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options
}
