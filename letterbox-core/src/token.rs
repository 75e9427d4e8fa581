//! Access credentials and the refresh collaborator.
//!
//! This module provides:
//! - [`Credential`] - The bearer access token of the signed-in user
//! - [`Refresher`] - Trait for the call that obtains a new credential
//! - [`RefreshError`] - Why a refresh failed

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::Secret;

/// A refresh attempt failed.
///
/// Cloneable so one outcome can be handed to every caller waiting on the
/// same refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("credential refresh failed: {message}")]
pub struct RefreshError {
    pub message: String,
}

impl RefreshError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Bearer credential for backend requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The token value.
    pub access_token: Secret,

    /// Token type (usually "Bearer").
    pub token_type: String,

    /// When this credential was obtained.
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    /// Create a bearer credential issued now.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token),
            token_type: "Bearer".to_string(),
            issued_at: Utc::now(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token.expose())
    }
}

/// Obtains a new credential, typically from a refresh endpoint backed by a
/// long-lived cookie.
///
/// Implementations only perform the network call. Storing the result and
/// deduplicating concurrent calls is the job of
/// [`RefreshCoordinator`](crate::refresh::RefreshCoordinator).
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self) -> Result<Credential, RefreshError>;
}
