//! In-memory credential storage.

use parking_lot::RwLock;

use super::CredentialStore;
use crate::token::Credential;

/// In-memory credential store.
///
/// Data is lost when the process exits, which is the intended lifetime of an
/// access token. Each instance is independent, so tests can run side by side.
///
/// # Thread Safety
///
/// Uses a `parking_lot::RwLock` and is safe to share across threads and tasks.
#[derive(Default)]
pub struct MemoryCredentialStore {
    current: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a credential.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            current: RwLock::new(Some(credential)),
        }
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("authenticated", &self.current.read().is_some())
            .finish()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.current.read().clone()
    }

    fn set(&self, credential: Option<Credential>) {
        let signed_in = credential.is_some();
        *self.current.write() = credential;
        tracing::trace!(signed_in, "credential updated");
    }
}
