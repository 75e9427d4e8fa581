//! Typed backend endpoints behind single-flight credential refresh.

use letterbox_core::{CredentialStore, RefreshCoordinator, ScheduleCodec, ScheduleSelection};
use letterbox_core::schedule::{Clock, TimezoneSource};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::auth::AuthSession;
use crate::client::{ApiClient, ApiRequest};
use crate::types::{
    ApiResponse, CreateProviderRequest, Inbox, Letter, LetterDetail, Provider, Result,
    Subscription, UpdateProviderRequest,
};

/// Locale sent with new providers.
pub const DEFAULT_LOCALE: &str = "En-US";

/// Entry point for authenticated backend calls.
///
/// Every call runs through a [`RefreshCoordinator`]: a 401 triggers one
/// shared refresh and a single retry.
pub struct LetterboxApi {
    client: ApiClient,
    session: Arc<AuthSession>,
    coordinator: Arc<RefreshCoordinator>,
}

impl LetterboxApi {
    pub fn new(client: ApiClient) -> Self {
        let session = Arc::new(AuthSession::new(client.clone()));
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(client.credentials()),
            session.clone(),
        ));
        Self {
            client,
            session,
            coordinator,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Login, logout, and account endpoints.
    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.credentials().is_authenticated()
    }

    /// Keep the credential fresh in the background while signed in.
    pub fn spawn_refresh_ticker(&self, period: Duration) -> JoinHandle<()> {
        self.coordinator.spawn_refresh_ticker(period)
    }

    /// Send `request` through the coordinator.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.coordinator
            .run(|| self.client.send(request.clone()))
            .await
    }

    async fn data<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response: ApiResponse<T> = self.send(request).await?;
        Ok(response.data)
    }

    // Providers

    pub async fn create_provider(&self, request: &CreateProviderRequest) -> Result<serde_json::Value> {
        self.send(ApiRequest::post("/provider/create").json(request)?)
            .await
    }

    /// Create a provider from a weekday/hour selection, encoding the schedule
    /// in the codec's timezone.
    pub async fn create_provider_with_schedule<C: Clock, Z: TimezoneSource>(
        &self,
        title: &str,
        summary: &str,
        tags: Vec<String>,
        selection: &ScheduleSelection,
        codec: &ScheduleCodec<C, Z>,
    ) -> Result<serde_json::Value> {
        let schedule = codec.encode_selection(selection)?;
        let request = CreateProviderRequest {
            title: title.to_string(),
            summary: summary.to_string(),
            tags,
            locale: DEFAULT_LOCALE.to_string(),
            schedule: schedule.to_string(),
        };
        self.create_provider(&request).await
    }

    pub async fn update_provider(&self, request: &UpdateProviderRequest) -> Result<serde_json::Value> {
        self.send(ApiRequest::patch("/provider/update").json(request)?)
            .await
    }

    pub async fn delete_provider(&self, provider_id: &str) -> Result<serde_json::Value> {
        self.send(ApiRequest::delete("/provider").query("providerId", provider_id))
            .await
    }

    pub async fn provider(&self, provider_id: &str) -> Result<Provider> {
        self.data(ApiRequest::get("/provider").query("providerId", provider_id))
            .await
    }

    /// Providers created by the signed-in user.
    pub async fn my_providers(&self) -> Result<Vec<Provider>> {
        self.data(ApiRequest::get("/provider/all")).await
    }

    /// Providers the signed-in user can subscribe to.
    pub async fn subscribable_providers(&self) -> Result<Vec<Provider>> {
        self.data(ApiRequest::get("/provider/subscribable")).await
    }

    // Subscriptions

    pub async fn subscribe(&self, provider_id: &str) -> Result<serde_json::Value> {
        self.send(
            ApiRequest::post("/subscription/subscribe")
                .json(&serde_json::json!({ "providerId": provider_id }))?,
        )
        .await
    }

    pub async fn unsubscribe(&self, provider_id: &str) -> Result<serde_json::Value> {
        self.send(ApiRequest::delete("/subscription/unsubscribe").query("providerId", provider_id))
            .await
    }

    pub async fn subscriptions(&self) -> Result<Vec<Subscription>> {
        self.data(ApiRequest::get("/subscription")).await
    }

    // Letters

    pub async fn letters(&self, provider_id: &str) -> Result<Vec<Letter>> {
        self.data(ApiRequest::get("/letter/all").query("providerId", provider_id))
            .await
    }

    pub async fn letter(&self, letter_id: &str) -> Result<LetterDetail> {
        self.data(ApiRequest::get("/letter").query("letterId", letter_id))
            .await
    }

    pub async fn inbox(&self) -> Result<Inbox> {
        self.data(ApiRequest::get("/letter/inbox")).await
    }
}

impl std::fmt::Debug for LetterboxApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LetterboxApi")
            .field("client", &self.client)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
