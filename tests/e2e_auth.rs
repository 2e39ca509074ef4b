//! E2E tests for session token authentication

mod common;

use chrono::Utc;
use common::TestServer;
use connecthub::auth::{Session, create_session_token};
use serde_json::Value;

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", Some("Alice"));

    let response = server
        .client
        .get(server.url("/api/auth/user"))
        .header("Cookie", format!("session={}", token))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["id"], "alice");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let server = TestServer::new().await;
    let session = Session::new("mallory", 3600);
    let token = create_session_token(&session, "another-secret-that-is-32-bytes!").unwrap();

    let response = server.get(&token, "/api/auth/user").await;

    assert_eq!(response.status(), 401);
    assert_eq!(server.state.db.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let server = TestServer::new().await;
    let mut session = Session::new("alice", 3600);
    session.expires_at = Utc::now() - chrono::Duration::seconds(1);
    let token = create_session_token(&session, &server.state.config.auth.session_secret).unwrap();

    let response = server.get(&token, "/api/auth/user").await;

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_later_sign_in_refreshes_identity_fields() {
    let server = TestServer::new().await;
    server.sign_in("alice", "Alice").await;

    let token = server.token_for("alice", Some("Alicia"));
    let user: Value = server
        .get(&token, "/api/auth/user")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(user["firstName"], "Alicia");
    assert_eq!(server.state.db.count_users().await.unwrap(), 1);
}
