//! Account and session endpoints.
//!
//! [`AuthSession`] performs sign-up, login, logout, password reset, email
//! verification, and credential refresh. It writes the credential store on
//! login, verification, and logout. Refresh results are stored by the
//! [`RefreshCoordinator`](letterbox_core::RefreshCoordinator) that calls it.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use letterbox_core::{Credential, RefreshError, Refresher};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::client::{ApiClient, ApiRequest};
use crate::types::{
    ApiResponse, AuthPayload, EmailVerificationRequest, LogInRequest, PasswordResetRequest,
    PasswordResetValidation, Result, SignUpRequest, User,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionOptions {
    is_session_only: bool,
}

/// The signed-in user's session.
pub struct AuthSession {
    client: ApiClient,
    persistent: AtomicBool,
    user: RwLock<Option<User>>,
}

impl AuthSession {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            persistent: AtomicBool::new(false),
            user: RwLock::new(None),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// The user returned by the last login or verification.
    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    /// Whether the user asked to stay signed in beyond this session.
    pub fn is_persistent(&self) -> bool {
        self.persistent.load(Ordering::Relaxed)
    }

    pub fn set_persistent(&self, persistent: bool) {
        self.persistent.store(persistent, Ordering::Relaxed);
    }

    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<serde_json::Value> {
        self.client
            .send(ApiRequest::post("/auth/signup").json(request)?)
            .await
    }

    /// Log in with email and password, storing the returned credential.
    pub async fn log_in(&self, request: &LogInRequest) -> Result<AuthPayload> {
        let basic = STANDARD.encode(format!("{}:{}", request.email, request.password));
        let response: ApiResponse<AuthPayload> = self
            .client
            .send(
                ApiRequest::post("/auth/login")
                    .authorization(format!("Basic {}", basic))
                    .json(&SessionOptions {
                        is_session_only: request.is_session_only,
                    })?,
            )
            .await?;

        let payload = response.data;
        self.set_persistent(!request.is_session_only);
        self.client
            .credentials()
            .set(Some(Credential::bearer(payload.access_token.clone())));
        *self.user.write() = payload.user.clone();

        info!("Logged in as {}", request.email);
        Ok(payload)
    }

    /// Log out. The local credential is cleared even if the backend call fails.
    pub async fn log_out(&self) -> Result<()> {
        let outcome = self
            .client
            .send::<serde_json::Value>(ApiRequest::post("/auth/logout"))
            .await;

        self.client.credentials().clear();
        *self.user.write() = None;

        match outcome {
            Ok(_) => {
                info!("Logged out");
                Ok(())
            }
            Err(e) => {
                warn!("Logout request failed, local session cleared anyway: {}", e);
                Err(e)
            }
        }
    }

    /// Ask for a password reset email.
    pub async fn forgot_password(&self, request: &PasswordResetValidation) -> Result<serde_json::Value> {
        self.client
            .send(ApiRequest::post("/auth/reset-password").json(request)?)
            .await
    }

    /// Set a new password using the emailed reset token.
    pub async fn reset_password(&self, request: &PasswordResetRequest) -> Result<serde_json::Value> {
        self.client
            .send(ApiRequest::patch("/auth/reset-password").json(request)?)
            .await
    }

    /// Confirm an email address. Signs the user in when the backend returns
    /// a credential with the confirmation.
    pub async fn verify_email(&self, request: &EmailVerificationRequest) -> Result<serde_json::Value> {
        let response: serde_json::Value = self
            .client
            .send(ApiRequest::post("/auth/verify").json(request)?)
            .await?;

        if let Some(token) = response
            .pointer("/data/accessToken")
            .and_then(|t| t.as_str())
        {
            self.client.credentials().set(Some(Credential::bearer(token)));
            *self.user.write() = response.pointer("/data/user").cloned();
            info!("Email verified, signed in");
        } else {
            debug!("Email verified without a credential");
        }

        Ok(response)
    }

    async fn request_refresh(&self) -> Result<Credential> {
        let response: ApiResponse<AuthPayload> = self
            .client
            .send(ApiRequest::post("/auth/refresh").json(&SessionOptions {
                is_session_only: !self.is_persistent(),
            })?)
            .await?;

        if let Some(user) = response.data.user {
            *self.user.write() = Some(user);
        }
        Ok(Credential::bearer(response.data.access_token))
    }
}

#[async_trait]
impl Refresher for AuthSession {
    async fn refresh(&self) -> std::result::Result<Credential, RefreshError> {
        self.request_refresh()
            .await
            .map_err(|e| RefreshError::new(e.to_string()))
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("client", &self.client)
            .field("persistent", &self.is_persistent())
            .finish()
    }
}
