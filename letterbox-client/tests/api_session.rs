//! Integration tests for the HTTP client against a mock backend.
//!
//! These tests verify that LetterboxApi and AuthSession:
//! - Attach the stored bearer credential
//! - Refresh once and retry when the backend answers 401
//! - Share one refresh between concurrent rejected calls
//! - Clear the session when refresh or logout fails
//! - Surface readable backend error messages

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use letterbox_client::{
    ApiClient, ApiError, EmailVerificationRequest, LetterboxApi, LogInRequest, UpdateProviderRequest,
};
use letterbox_core::schedule::{FixedClock, FixedTimezone, ScheduleCodec};
use letterbox_core::{Credential, CredentialStore, MemoryCredentialStore, Period, ScheduleSelection, Weekday};
use wiremock::{
    matchers::{body_json, body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn api_for(server: &MockServer, token: Option<&str>) -> (Arc<MemoryCredentialStore>, LetterboxApi) {
    let store = Arc::new(match token {
        Some(token) => MemoryCredentialStore::with_credential(Credential::bearer(token)),
        None => MemoryCredentialStore::new(),
    });
    let client = ApiClient::builder()
        .base_url(server.uri())
        .credentials(store.clone())
        .build()
        .unwrap();
    (store, LetterboxApi::new(client))
}

fn inbox_body() -> serde_json::Value {
    serde_json::json!({
        "data": {
            "letters": [{
                "providerId": "p-1",
                "providerTitle": "Rust Weekly",
                "letterId": "l-9",
                "title": "Issue 9"
            }]
        }
    })
}

async fn mount_inbox(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/letter/inbox"))
        .and(header("Authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(inbox_body()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/letter/inbox"))
        .and(header("Authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "data": { "message": "UnauthorizedError: Error: Authentication is required" }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_bearer_credential_is_attached() {
    let server = MockServer::start().await;
    mount_inbox(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (_store, api) = api_for(&server, Some("fresh-token"));
    let inbox = api.inbox().await.unwrap();

    assert_eq!(inbox.letters.len(), 1);
    assert_eq!(inbox.letters[0].letter_id, "l-9");
}

#[tokio::test]
async fn test_unauthorized_call_refreshes_and_retries() {
    let server = MockServer::start().await;
    mount_inbox(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(serde_json::json!({ "isSessionOnly": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "accessToken": "fresh-token" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, api) = api_for(&server, Some("stale-token"));
    let inbox = api.inbox().await.unwrap();

    assert_eq!(inbox.letters[0].provider_title, "Rust Weekly");
    assert_eq!(store.get().unwrap().access_token.expose(), "fresh-token");
}

#[tokio::test]
async fn test_concurrent_rejections_share_one_refresh() {
    let server = MockServer::start().await;
    mount_inbox(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "data": { "accessToken": "fresh-token" } }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_store, api) = api_for(&server, Some("stale-token"));
    let results = join_all((0..10).map(|_| api.inbox())).await;

    for result in results {
        assert_eq!(result.unwrap().letters.len(), 1);
    }
    assert!(!api.coordinator().is_refreshing());
}

#[tokio::test]
async fn test_failed_refresh_clears_session() {
    let server = MockServer::start().await;
    mount_inbox(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "data": { "message": "Refresh token is required" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, api) = api_for(&server, Some("stale-token"));
    let error = api.inbox().await.unwrap_err();

    match error {
        ApiError::Refresh(e) => assert!(e.message.contains("Refresh token is required")),
        other => panic!("expected refresh error, got {:?}", other),
    }
    assert!(store.get().is_none());
    assert!(!api.is_authenticated());
}

#[tokio::test]
async fn test_backend_error_message_is_normalized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/provider"))
        .and(query_param("providerId", "missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "data": { "message": "NotFoundError: Error: Provider not found" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (_store, api) = api_for(&server, Some("fresh-token"));
    let error = api.provider("missing").await.unwrap_err();

    assert_eq!(error.status(), Some(404));
    assert_eq!(error.to_string(), "request failed (404): Provider not found");
}

#[tokio::test]
async fn test_log_in_sends_basic_header_and_stores_credential() {
    let server = MockServer::start().await;
    let basic = STANDARD.encode("reader@example.com:hunter2");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("Authorization", format!("Basic {}", basic).as_str()))
        .and(body_json(serde_json::json!({ "isSessionOnly": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "accessToken": "login-token",
                "user": { "email": "reader@example.com" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, api) = api_for(&server, None);
    let payload = api
        .session()
        .log_in(&LogInRequest {
            email: "reader@example.com".to_string(),
            password: "hunter2".to_string(),
            is_session_only: false,
        })
        .await
        .unwrap();

    assert_eq!(payload.access_token, "login-token");
    assert_eq!(store.get().unwrap().access_token.expose(), "login-token");
    assert!(api.session().is_persistent());
    assert_eq!(api.session().user().unwrap()["email"], "reader@example.com");
}

#[tokio::test]
async fn test_log_out_clears_session_even_when_backend_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "data": { "message": "Error: session store unavailable" }
        })))
        .mount(&server)
        .await;

    let (store, api) = api_for(&server, Some("fresh-token"));
    let error = api.session().log_out().await.unwrap_err();

    assert!(matches!(
        error,
        ApiError::Status { status: 500, ref message } if message == "session store unavailable"
    ));
    assert!(store.get().is_none());
    assert!(api.session().user().is_none());
}

#[tokio::test]
async fn test_verify_email_signs_in() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/verify"))
        .and(body_json(serde_json::json!({ "email": "reader@example.com", "code": "123456" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "accessToken": "verified-token", "user": { "email": "reader@example.com" } }
        })))
        .mount(&server)
        .await;

    let (store, api) = api_for(&server, None);
    api.session()
        .verify_email(&EmailVerificationRequest {
            email: "reader@example.com".to_string(),
            code: "123456".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(store.get().unwrap().access_token.expose(), "verified-token");
}

#[tokio::test]
async fn test_create_provider_sends_encoded_schedule() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/provider/create"))
        .and(header("Authorization", "Bearer fresh-token"))
        .and(body_partial_json(serde_json::json!({
            "title": "Rust Weekly",
            "locale": "En-US",
            "schedule": "cron(0 16 ? * 7 *)"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "message": "Provider created" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let codec = ScheduleCodec::new(
        FixedClock(Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()),
        FixedTimezone::parse("Asia/Tokyo").unwrap(),
    );
    let selection = ScheduleSelection::new(Weekday::Sun, 1, Period::Am).unwrap();

    let (_store, api) = api_for(&server, Some("fresh-token"));
    let response = api
        .create_provider_with_schedule(
            "Rust Weekly",
            "All things Rust, every week.",
            vec!["rust".to_string()],
            &selection,
            &codec,
        )
        .await
        .unwrap();

    assert_eq!(response["data"]["message"], "Provider created");
}

#[tokio::test]
async fn test_unsubscribe_uses_query_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/subscription/unsubscribe"))
        .and(query_param("providerId", "p-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (_store, api) = api_for(&server, Some("fresh-token"));
    let response = api.unsubscribe("p-1").await.unwrap();

    assert!(response.is_null());
}

#[tokio::test]
async fn test_update_provider_refreshes_and_retries() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/provider/update"))
        .and(header("Authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/provider/update"))
        .and(header("Authorization", "Bearer fresh-token"))
        .and(body_json(serde_json::json!({
            "providerId": "p-1",
            "title": "Rust Fortnightly",
            "summary": "All things Rust, every other week."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "message": "Provider updated" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "accessToken": "fresh-token" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_store, api) = api_for(&server, Some("stale-token"));
    let request = UpdateProviderRequest {
        provider_id: "p-1".to_string(),
        title: "Rust Fortnightly".to_string(),
        summary: "All things Rust, every other week.".to_string(),
    };
    let response = api.update_provider(&request).await.unwrap();

    assert_eq!(response["data"]["message"], "Provider updated");
}

#[tokio::test]
async fn test_delete_provider_uses_query_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/provider"))
        .and(query_param("providerId", "p-1"))
        .and(header("Authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "message": "Provider deleted" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_store, api) = api_for(&server, Some("fresh-token"));
    let response = api.delete_provider("p-1").await.unwrap();

    assert_eq!(response["data"]["message"], "Provider deleted");
}
