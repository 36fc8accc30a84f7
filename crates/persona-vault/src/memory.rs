//! In-memory credential repository for tests and embedding.

use crate::error::Result;
use crate::store::CredentialRepository;
use async_trait::async_trait;
use persona_core::Credential;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Keeps the credential in process memory only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: Mutex<Option<Credential>>,
    stores: AtomicUsize,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `credential`.
    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
            stores: AtomicUsize::new(0),
        }
    }

    /// Number of successful `store` calls.
    #[must_use]
    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        // A poisoned lock only means a panicking test; the value is still usable
        self.credential
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialRepository for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot().clone())
    }

    async fn store(&self, credential: &Credential) -> Result<()> {
        *self.slot() = Some(credential.clone());
        self.stores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
