use chrono::{DateTime, Utc};
use letterbox_core::{AuthFailure, RefreshError, ScheduleError};
use serde::{Deserialize, Serialize};

/// Errors that can occur when talking to the Letterbox backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend rejected the credential (HTTP 401).
    #[error("authentication required: {message}")]
    Unauthorized { message: String },

    /// Any other non-success status.
    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// Transport failure: connection refused, timeout, TLS, ...
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The configured base URL or a request path is malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A request body could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Refreshing the credential failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// A schedule could not be encoded.
    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),
}

impl ApiError {
    /// HTTP status of the failure, if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Only a 401 from the backend counts as an authentication failure. A missing
/// credential is sent without an `Authorization` header and comes back as 401
/// too, so no separate "no credential" rule is needed.
impl AuthFailure for ApiError {
    fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Result type for Letterbox client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// The backend wraps every payload in `{ "data": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Signed-in user as returned by the backend. The shape is owned by the
/// backend and kept as raw JSON.
pub type User = serde_json::Value;

/// Token payload returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Login form. Email and password travel in a Basic `Authorization` header,
/// not in the body.
#[derive(Debug, Clone)]
pub struct LogInRequest {
    pub email: String,
    pub password: String,
    /// Ask the backend for a session-only refresh cookie.
    pub is_session_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetValidation {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailVerificationRequest {
    pub email: String,
    pub code: String,
}

/// A newsletter feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(default)]
    pub provider_id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub locale: String,
    /// Schedule token, `cron(0 H ? * D *)`.
    pub schedule: String,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProviderRequest {
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub locale: String,
    pub schedule: String,
}

/// Editable provider fields. The schedule is fixed once a provider exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProviderRequest {
    pub provider_id: String,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscription_id: String,
    pub provider_id: String,
    pub title: String,
    pub schedule: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub subscription_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Letter {
    pub letter_id: String,
    pub title: String,
    #[serde(default)]
    pub s3_path: String,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
}

/// A letter with its rendered body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterDetail {
    pub letter_id: String,
    pub title: String,
    #[serde(default)]
    pub s3_path: String,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    pub html: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxLetter {
    pub provider_id: String,
    pub provider_title: String,
    pub letter_id: String,
    pub title: String,
    #[serde(default)]
    pub s3_path: String,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inbox {
    #[serde(default)]
    pub letters: Vec<InboxLetter>,
}
