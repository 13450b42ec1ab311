//! Mock backend tests for the wicket HTTP client and session manager.
//!
//! These tests use wiremock to simulate the backend API and exercise the
//! full stack, reqwest transport included, without network access.

use std::time::Duration;

use futures_util::future::join_all;
use serde_json::{Value, json};
use wicket_core::{ApiUrl, CredentialPair, LoginCredentials, Registration, SessionStore};
use wicket_http::{ApiClient, ClientConfig, SessionManager, SessionStatus};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create an API URL from a mock server.
fn mock_api_url(server: &MockServer) -> ApiUrl {
    ApiUrl::new(&format!("http://127.0.0.1:{}", server.address().port())).unwrap()
}

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(mock_api_url(server)).with_timeout(Duration::from_secs(5))
}

fn seeded_store(access: &str, refresh: &str) -> SessionStore {
    let store = SessionStore::in_memory();
    store
        .credentials()
        .set_pair(&CredentialPair::new(access, refresh));
    store
}

async fn mount_profile(server: &MockServer, token: &str, user: Value) {
    Mock::given(method("GET"))
        .and(path("/profile/"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "user": user})),
        )
        .mount(server)
        .await;
}

async fn mount_expired_profile(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/profile/"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Token expired",
            "code": "TOKEN_EXPIRED"
        })))
        .mount(server)
        .await;
}

// ============================================================================
// Login and Registration
// ============================================================================

#[tokio::test]
async fn test_login_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({
            "email": "a@b.com",
            "password": "secret123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "user": {"id": 1, "first_name": "A"},
            "tokens": {"access": "A1", "refresh": "R1"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_profile(&server, "A1", json!({"id": 1, "first_name": "A"})).await;

    let store = SessionStore::in_memory();
    let session = SessionManager::connect(config(&server), store.clone()).unwrap();
    assert!(session.initialize().is_none());

    let profile = session
        .login(LoginCredentials::new("a@b.com", "secret123"))
        .await
        .unwrap();

    assert_eq!(profile.id, 1);
    let state = session.state();
    assert_eq!(state.status, SessionStatus::Authenticated);
    assert_eq!(state.user.unwrap().first_name.as_deref(), Some("A"));
    assert!(!state.busy);
    assert_eq!(store.profile().load().unwrap().profile.id, 1);
    assert_eq!(store.credentials().get(), CredentialPair::new("A1", "R1"));
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Invalid email or password",
            "code": "INVALID_CREDENTIALS"
        })))
        .mount(&server)
        .await;
    // A rejected login must not trigger a refresh.
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = SessionStore::in_memory();
    let session = SessionManager::connect(config(&server), store.clone()).unwrap();
    assert!(session.initialize().is_none());

    let err = session
        .login(LoginCredentials::new("a@b.com", "wrong"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("401"));
    let state = session.state();
    assert_eq!(state.status, SessionStatus::Unauthenticated);
    assert_eq!(state.error.as_deref(), Some("Invalid email or password"));
    assert!(store.credentials().get().is_empty());
}

#[tokio::test]
async fn test_register_forwards_profile_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({
            "email": "new@b.com",
            "password": "secret123",
            "first_name": "New",
            "company": "Acme"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "tokens": {"accessToken": "A1", "refreshToken": "R1"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_profile(&server, "A1", json!({"id": 7, "first_name": "New"})).await;

    let session = SessionManager::connect(config(&server), SessionStore::in_memory()).unwrap();
    let registration = Registration::new("new@b.com", "secret123")
        .with_first_name("New")
        .with_field("company", "Acme");

    let profile = session.register(registration).await.unwrap();

    assert_eq!(profile.id, 7);
    assert!(session.is_authenticated());
}

// ============================================================================
// Token Refresh
// ============================================================================

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;

    mount_expired_profile(&server, "A0").await;
    mount_profile(&server, "A1", json!({"id": 1})).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .and(body_json(json!({"refreshToken": "R0"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "accessToken": "A1"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    let client = ApiClient::new(config(&server), store.clone()).unwrap();

    let requests = (0..5).map(|_| client.get::<Value>("/profile/"));
    let results = join_all(requests).await;

    for result in results {
        let body = result.unwrap();
        assert_eq!(body["user"]["id"], 1);
    }
    assert_eq!(
        store.credentials().access_token().unwrap().as_str(),
        "A1"
    );
    assert_eq!(
        store.credentials().refresh_token().unwrap().as_str(),
        "R0"
    );
}

#[tokio::test]
async fn test_refresh_rotates_refresh_token() {
    let server = MockServer::start().await;

    mount_expired_profile(&server, "A0").await;
    mount_profile(&server, "A1", json!({"id": 1})).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "accessToken": "A1",
            "refreshToken": "R1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    let client = ApiClient::new(config(&server), store.clone()).unwrap();
    let _: Value = client.get("/profile/").await.unwrap();

    assert_eq!(store.credentials().get(), CredentialPair::new("A1", "R1"));
}

#[tokio::test]
async fn test_replayed_401_is_terminal() {
    let server = MockServer::start().await;

    mount_expired_profile(&server, "A0").await;
    mount_expired_profile(&server, "A1").await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "accessToken": "A1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(config(&server), seeded_store("A0", "R0")).unwrap();
    let err = client.get::<Value>("/profile/").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!err.is_session_expired());
}

#[tokio::test]
async fn test_refresh_failure_expires_session() {
    let server = MockServer::start().await;

    mount_expired_profile(&server, "A0").await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Invalid refresh token",
            "code": "INVALID_TOKEN"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    store
        .profile()
        .save(&serde_json::from_value(json!({"id": 1})).unwrap());
    let session = SessionManager::connect(config(&server), store.clone()).unwrap();

    let handle = session.initialize().unwrap();
    assert_eq!(session.state().status, SessionStatus::Authenticated);
    handle.await.unwrap();

    let state = session.state();
    assert_eq!(state.status, SessionStatus::Unauthenticated);
    assert!(state.user.is_none());
    assert!(store.credentials().get().is_empty());
    assert!(store.profile().load().is_none());
}

#[tokio::test]
async fn test_logout_during_refresh_leaves_store_empty() {
    let server = MockServer::start().await;

    mount_expired_profile(&server, "A0").await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "accessToken": "A1"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    let session = SessionManager::connect(config(&server), store.clone()).unwrap();

    let pending = tokio::spawn({
        let client = session.client().clone();
        async move { client.get::<Value>("/profile/").await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    session.logout().await;
    assert!(store.credentials().get().is_empty());

    let result = pending.await.unwrap();
    assert!(result.is_err());
    assert!(store.credentials().get().is_empty());
    assert_eq!(session.state().status, SessionStatus::Unauthenticated);
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn test_initialize_replaces_cached_profile() {
    let server = MockServer::start().await;
    mount_profile(&server, "A0", json!({"id": 1, "first_name": "Renamed"})).await;

    let store = seeded_store("A0", "R0");
    store
        .profile()
        .save(&serde_json::from_value(json!({"id": 1, "first_name": "Old"})).unwrap());
    let session = SessionManager::connect(config(&server), store.clone()).unwrap();

    let handle = session.initialize().unwrap();
    assert_eq!(
        session.state().user.unwrap().first_name.as_deref(),
        Some("Old")
    );
    handle.await.unwrap();

    assert_eq!(
        session.state().user.unwrap().first_name.as_deref(),
        Some("Renamed")
    );
}

#[tokio::test]
async fn test_initialize_keeps_cache_when_backend_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    store
        .profile()
        .save(&serde_json::from_value(json!({"id": 1})).unwrap());
    let session = SessionManager::connect(config(&server), store.clone()).unwrap();

    session.initialize().unwrap().await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.state().user.unwrap().id, 1);
    assert!(!store.credentials().get().is_empty());
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_clears_state_on_server_error() {
    let server = MockServer::start().await;
    mount_profile(&server, "A0", json!({"id": 1})).await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer A0"))
        .and(body_json(json!({"refreshToken": "R0"})))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    let session = SessionManager::connect(config(&server), store.clone()).unwrap();
    session.initialize().unwrap().await.unwrap();
    assert!(session.is_authenticated());

    session.logout().await;

    let state = session.state();
    assert_eq!(state.status, SessionStatus::Unauthenticated);
    assert!(state.user.is_none());
    assert!(!state.busy);
    assert!(store.credentials().get().is_empty());
    assert!(store.profile().load().is_none());
}

#[tokio::test]
async fn test_logout_clears_state_when_server_unreachable() {
    let url = {
        let server = MockServer::start().await;
        mock_api_url(&server)
    };

    let store = seeded_store("A0", "R0");
    let session = SessionManager::connect(
        ClientConfig::new(url).with_timeout(Duration::from_secs(2)),
        store.clone(),
    )
    .unwrap();

    session.logout().await;

    assert_eq!(session.state().status, SessionStatus::Unauthenticated);
    assert!(store.credentials().get().is_empty());
}
