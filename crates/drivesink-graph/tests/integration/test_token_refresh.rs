//! Token refresh lifecycle integration tests
//!
//! Drives a [`TokenManager`] against a wiremock token endpoint to verify
//! refresh semantics, single-flight behavior, and fatal-vs-transient
//! error classification.

use std::sync::Arc;

use chrono::{Duration, Utc};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivesink_core::domain::TokenError;
use drivesink_core::ports::{ITokenProvider, ITokenStore, TokenSet};
use drivesink_graph::auth::{FileTokenStore, OAuthConfig, PkceFlow};
use drivesink_graph::token_manager::TokenManager;

fn flow_against(server: &MockServer) -> PkceFlow {
    let config = OAuthConfig::new(
        "test-app-id",
        "http://127.0.0.1:8400/callback",
        vec!["Files.Read".to_string(), "offline_access".to_string()],
    )
    .with_token_url(format!("{}/token", server.uri()));
    PkceFlow::new(&config).unwrap()
}

fn expired_tokens() -> TokenSet {
    TokenSet {
        access_token: "stale-access".to_string(),
        refresh_token: "old-refresh".to_string(),
        expires_at: Utc::now() - Duration::minutes(1),
    }
}

async fn seeded_store(dir: &tempfile::TempDir, tokens: TokenSet) -> Arc<FileTokenStore> {
    let store = Arc::new(FileTokenStore::new(dir.path().join("tokens.json")));
    store.save(&tokens).await.unwrap();
    store
}

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, expired_tokens()).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("refresh_token"))
        .and(body_string_contains("old-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "new-access",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "new-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::new(flow_against(&server), store.clone(), Duration::minutes(5));

    let token = manager.access_token().await.unwrap();
    assert_eq!(token.secret(), "new-access");

    // Rotation persisted for the next restart.
    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(saved.access_token, "new-access");
    assert_eq!(saved.refresh_token, "new-refresh");
    assert!(saved.expires_at > Utc::now());
}

#[tokio::test]
async fn test_refresh_keeps_old_refresh_token_when_not_rotated() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, expired_tokens()).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "new-access",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let manager = TokenManager::new(flow_against(&server), store.clone(), Duration::minutes(5));
    manager.access_token().await.unwrap();

    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(saved.refresh_token, "old-refresh");
}

#[tokio::test]
async fn test_concurrent_callers_trigger_exactly_one_refresh() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, expired_tokens()).await;

    // expect(1) makes the mock server itself assert single-flight.
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "new-access",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "new-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let manager = Arc::new(TokenManager::new(
        flow_against(&server),
        store,
        Duration::minutes(5),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(
            async move { manager.access_token().await },
        ));
    }

    for handle in handles {
        let token = handle.await.unwrap().unwrap();
        assert_eq!(token.secret(), "new-access");
    }
}

#[tokio::test]
async fn test_invalid_grant_is_fatal_and_clears_store() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, expired_tokens()).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "AADSTS70000: the refresh token has expired"
        })))
        .mount(&server)
        .await;

    let manager = TokenManager::new(flow_against(&server), store.clone(), Duration::minutes(5));

    let err = manager.access_token().await.unwrap_err();
    assert!(matches!(err, TokenError::Rejected(_)));
    assert!(err.is_fatal());

    // Dead credential must not be retried after a restart.
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_is_transient_and_retried() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, expired_tokens()).await;

    // expect(3) asserts the manager retried the endpoint with backoff
    // before giving up.
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "error": "temporarily_unavailable"
        })))
        .expect(3)
        .mount(&server)
        .await;

    let manager = TokenManager::new(flow_against(&server), store.clone(), Duration::minutes(5))
        .with_refresh_backoff(3, std::time::Duration::from_millis(1));

    let err = manager.access_token().await.unwrap_err();
    assert!(matches!(err, TokenError::Transport(_)));
    assert!(!err.is_fatal());

    // Transient failures leave the stored set intact.
    assert!(store.load().await.unwrap().is_some());
}
