//! Letterbox Client Library
//!
//! An async Rust client for the Letterbox newsletter backend.
//!
//! # Overview
//!
//! The backend speaks JSON over HTTP and wraps every payload in
//! `{ "data": ... }`. Authenticated endpoints take a short-lived bearer
//! credential; a long-lived refresh cookie set at login lets the client mint
//! a new one. This crate sends the credential, notices when the backend
//! rejects it, refreshes once for however many calls were rejected, and
//! retries.
//!
//! # Features
//!
//! - **Typed endpoints**: providers, subscriptions, letters, and the inbox
//! - **Session management**: sign-up, login, logout, password reset, email verification
//! - **Single-flight refresh**: concurrent 401s share one call to `/auth/refresh`
//! - **Periodic refresh**: optional background ticker while signed in
//!
//! # Quick Start
//!
//! ```no_run
//! use letterbox_client::{ApiClient, LetterboxApi, LogInRequest};
//!
//! #[tokio::main]
//! async fn main() -> letterbox_client::Result<()> {
//!     let client = ApiClient::builder().base_url("http://localhost:8000").build()?;
//!     let api = LetterboxApi::new(client);
//!
//!     api.session()
//!         .log_in(&LogInRequest {
//!             email: "reader@example.com".to_string(),
//!             password: "hunter2".to_string(),
//!             is_session_only: true,
//!         })
//!         .await?;
//!
//!     for letter in api.inbox().await?.letters {
//!         println!("{}: {}", letter.provider_title, letter.title);
//!     }
//!
//!     api.session().log_out().await
//! }
//! ```

mod api;
mod auth;
mod client;
pub mod types;

pub use api::{LetterboxApi, DEFAULT_LOCALE};
pub use auth::AuthSession;
pub use client::{ApiClient, ApiClientBuilder, ApiRequest, DEFAULT_BASE_URL};

pub use types::{
    ApiError, ApiResponse, AuthPayload, CreateProviderRequest, EmailVerificationRequest, Inbox,
    InboxLetter, Letter, LetterDetail, LogInRequest, PasswordResetRequest,
    PasswordResetValidation, Provider, Result, SignUpRequest, Subscription, UpdateProviderRequest,
    User,
};
