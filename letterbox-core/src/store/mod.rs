//! Credential storage.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`CredentialStore`] - Trait for the holder of the current credential
//! - [`MemoryCredentialStore`] - In-memory implementation
//!
//! Credentials are never written to stable storage. A store holds at most one
//! credential, the bearer token of the signed-in user.
//!
//! # Example
//!
//! ```rust
//! use letterbox_core::{Credential, CredentialStore, MemoryCredentialStore};
//!
//! let store = MemoryCredentialStore::new();
//! assert!(store.get().is_none());
//!
//! store.set(Some(Credential::bearer("access-token")));
//! assert_eq!(store.get().unwrap().access_token.expose(), "access-token");
//!
//! store.clear();
//! assert!(!store.is_authenticated());
//! ```

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::token::Credential;

mod memory;

pub use memory::MemoryCredentialStore;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value,
/// and the bytes are wiped when the secret is dropped.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Holder of the current credential.
///
/// Reads and writes are synchronous and cheap. Only login, logout, and the
/// refresh coordinator write to the store.
pub trait CredentialStore: Send + Sync {
    /// The current credential, if any.
    fn get(&self) -> Option<Credential>;

    /// Replace the current credential. `None` signs the user out.
    fn set(&self, credential: Option<Credential>);

    /// Drop the current credential.
    fn clear(&self) {
        self.set(None);
    }

    /// Whether a credential is present.
    fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_secret_display_redacted() {
        let secret = Secret::new("super-secret");
        let display = format!("{}", secret);
        assert!(!display.contains("super-secret"));
        assert!(display.contains("REDACTED"));
    }

    #[test]
    fn test_secret_zeroize() {
        let mut secret = Secret::new("super-secret");
        secret.zeroize();
        assert!(secret.is_empty());
    }
}
