use crate::types::{ApiError, Result};
use letterbox_core::{CredentialStore, MemoryCredentialStore};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

/// Default backend address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// A single backend call, built up before sending.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    authorization: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            authorization: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Use this `Authorization` value instead of the stored credential.
    pub fn authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// HTTP client for the Letterbox backend.
///
/// Sends JSON, attaches the stored bearer credential, keeps cookies (the
/// refresh endpoint depends on one), and turns non-success responses into
/// [`ApiError`].
///
/// # Example
///
/// ```no_run
/// use letterbox_client::{ApiClient, ApiRequest, Inbox, ApiResponse};
///
/// #[tokio::main]
/// async fn main() -> letterbox_client::Result<()> {
///     let client = ApiClient::builder().base_url("http://localhost:8000").build()?;
///     let inbox: ApiResponse<Inbox> = client.send(ApiRequest::get("/letter/inbox")).await?;
///     println!("{} letters", inbox.data.letters.len());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The store the bearer credential is read from.
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Resolve a request path against the base URL, keeping any base path.
    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{}", base, path))?)
    }

    /// Send a request and decode the JSON response body.
    ///
    /// An empty success body decodes as JSON `null`, so `()` and
    /// `Option<_>` work for endpoints that return nothing.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let url = self.endpoint(&request.path)?;
        debug!("{} {}", request.method, url.path());

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(CONTENT_TYPE, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        match (&request.authorization, self.credentials.get()) {
            (Some(explicit), _) => builder = builder.header(AUTHORIZATION, explicit),
            (None, Some(credential)) => {
                builder = builder.header(AUTHORIZATION, credential.authorization_header())
            }
            (None, None) => trace!("no credential, sending {} unauthenticated", request.path),
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let error = error_from_response(status, &text);
            warn!("{} {} failed: {}", request.method, request.path, error);
            return Err(error);
        }

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.credentials.is_authenticated())
            .finish()
    }
}

/// Map a non-success response to an [`ApiError`].
pub(crate) fn error_from_response(status: StatusCode, body: &str) -> ApiError {
    let message = normalize_error_message(body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    if status == StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized { message }
    } else {
        ApiError::Status {
            status: status.as_u16(),
            message,
        }
    }
}

/// Pull a readable message out of a backend error body.
///
/// The backend reports `{ "data": { "message": "SomeError: Error: text" } }`;
/// only the text after the first `"Error: "` marker is kept.
pub(crate) fn normalize_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value
        .pointer("/data/message")
        .or_else(|| value.get("message"))?
        .as_str()?;

    let message = match message.split_once("Error: ") {
        Some((_, rest)) => rest.split("Error: ").next().unwrap_or(rest),
        None => message,
    };

    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}

/// Builder for creating an [`ApiClient`] with custom configuration.
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Option<Duration>,
    credentials: Option<Arc<dyn CredentialStore>>,
}

impl ApiClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            credentials: None,
        }
    }

    /// Set the backend base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Share an existing credential store.
    pub fn credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ApiClient> {
        let base_url = Url::parse(&self.base_url)?;

        let mut http = reqwest::Client::builder().cookie_store(true);
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));

        Ok(ApiClient {
            http,
            base_url,
            credentials,
        })
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
