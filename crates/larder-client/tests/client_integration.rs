//! Integration tests for the Larder API client against a mock server.

use std::sync::Arc;

use larder_auth::{Credentials, CredentialStore, InMemoryCredentialStore};
use larder_client::{LarderClient, ListResourcesQuery, SendMessageRequest};
use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with_store(server: &MockServer, store: Arc<InMemoryCredentialStore>) -> LarderClient {
    LarderClient::builder()
        .base_url(server.uri())
        .credentials(store)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_profile_get_sends_bearer_and_unwraps_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .and(header("authorization", "Bearer tok-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "id": "u1",
                "username": "alice",
                "email": "alice@example.com",
                "role": "user"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::with_credentials(
        Credentials::new("tok-abc", true),
    ));
    let client = client_with_store(&server, store);

    let user = client.profile().get().await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.role, "user");
}

#[tokio::test]
async fn test_token_is_reread_per_request() {
    let server = MockServer::start().await;

    // First request carries a header, second (after clearing the store) must not.
    Mock::given(method("GET"))
        .and(path("/api/v1/analytics/summary"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "monthly_spend": 120.5 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/analytics/summary"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "missing token"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::with_credentials(
        Credentials::new("tok-abc", false),
    ));
    let client = client_with_store(&server, store.clone());

    let summary = client.analytics().summary().await.unwrap();
    assert_eq!(summary.monthly_spend, 120.5);

    // Simulates a logout in another view between two requests.
    store.clear().await.unwrap();

    let err = client.analytics().summary().await.unwrap_err();
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_401_maps_to_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "token expired"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::with_credentials(
        Credentials::new("stale", false),
    ));
    let client = client_with_store(&server, store);

    let err = client.profile().get().await.unwrap_err();
    assert!(err.is_auth_error());
    assert!(err.to_string().contains("token expired"));
}

#[tokio::test]
async fn test_envelope_failure_on_2xx_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "account disabled"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::with_credentials(
        Credentials::new("tok", false),
    ));
    let client = client_with_store(&server, store);

    let err = client.profile().get().await.unwrap_err();
    assert!(err.to_string().contains("account disabled"));
}

#[tokio::test]
async fn test_resources_list_sends_query_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/resources"))
        .and(query_param("category", "nutrition"))
        .and(query_param("kind", "article"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{
                "id": "r1",
                "category": "nutrition",
                "kind": "article",
                "title": "Reading labels",
                "content": "..."
            }]
        })))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::with_credentials(
        Credentials::new("tok", false),
    ));
    let client = client_with_store(&server, store);

    let resources = client
        .resources()
        .list(&ListResourcesQuery {
            category: "nutrition".into(),
            kind: "article".into(),
        })
        .await
        .unwrap();

    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].title, "Reading labels");
}

#[tokio::test]
async fn test_chat_send_and_delete_inventory() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "id": "m1",
                "role": "assistant",
                "content": "Hi!",
                "timestamp": "2026-01-01T00:00:00Z"
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/inventory/item-9"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::with_credentials(
        Credentials::new("tok", false),
    ));
    let client = client_with_store(&server, store);

    let reply = client
        .chat()
        .send(&SendMessageRequest::new("hello"))
        .await
        .unwrap();
    assert_eq!(reply.role, "assistant");

    client.inventory().delete("item-9").await.unwrap();
}

#[tokio::test]
async fn test_malformed_error_body_still_classified() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::with_credentials(
        Credentials::new("tok", false),
    ));
    let client = client_with_store(&server, store);

    let err = client.profile().get().await.unwrap_err();
    assert!(err.is_server_error());
}
