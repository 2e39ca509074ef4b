//! E2E tests for the connection request lifecycle

mod common;

use common::{TestServer, error_message};
use serde_json::{Value, json};

async fn request_connection(server: &TestServer, token: &str, receiver_id: &str) -> Value {
    let response = server
        .post(token, "/api/connections", json!({ "receiverId": receiver_id }))
        .await;
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_request_and_accept_connection() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;

    let connection = request_connection(&server, &alice, "bob").await;
    assert_eq!(connection["status"], "pending");
    assert_eq!(connection["requesterId"], "alice");
    assert_eq!(connection["receiverId"], "bob");
    let connection_id = connection["id"].as_str().unwrap();

    let requests: Vec<Value> = server
        .get(&bob, "/api/connection-requests")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["requester"]["id"], "alice");
    assert_eq!(requests[0]["requester"]["firstName"], "Alice");
    assert!(requests[0].get("user").is_none());

    let response = server
        .put(
            &bob,
            &format!("/api/connections/{}", connection_id),
            json!({ "status": "accepted" }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["status"], "accepted");

    for (token, other) in [(&alice, "bob"), (&bob, "alice")] {
        let connections: Vec<Value> = server
            .get(token, "/api/connections")
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0]["user"]["id"], other);
    }

    let notifications: Vec<Value> = server
        .get(&alice, "/api/notifications")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(notifications[0]["type"], "connection_accepted");
}

#[tokio::test]
async fn test_cannot_connect_with_yourself() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;

    let response = server
        .post(&alice, "/api/connections", json!({ "receiverId": "alice" }))
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "Cannot connect with yourself");
}

#[tokio::test]
async fn test_unknown_receiver_is_not_found() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;

    let response = server
        .post(&alice, "/api/connections", json!({ "receiverId": "ghost" }))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_duplicate_request_in_either_direction() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;

    request_connection(&server, &alice, "bob").await;

    let response = server
        .post(&alice, "/api/connections", json!({ "receiverId": "bob" }))
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "Connection already exists");

    let response = server
        .post(&bob, "/api/connections", json!({ "receiverId": "alice" }))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_concurrent_requests_create_one_row() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;

    let (first, second) = tokio::join!(
        server.post(&alice, "/api/connections", json!({ "receiverId": "bob" })),
        server.post(&bob, "/api/connections", json!({ "receiverId": "alice" })),
    );
    let statuses = [first.status().as_u16(), second.status().as_u16()];
    assert!(statuses.contains(&200));
    assert!(statuses.contains(&400));
}

#[tokio::test]
async fn test_only_receiver_may_respond() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    server.sign_in("bob", "Bob").await;

    let connection = request_connection(&server, &alice, "bob").await;
    let path = format!("/api/connections/{}", connection["id"].as_str().unwrap());

    let response = server
        .put(&alice, &path, json!({ "status": "accepted" }))
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_invalid_status_and_resolved_rows() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;

    let connection = request_connection(&server, &alice, "bob").await;
    let path = format!("/api/connections/{}", connection["id"].as_str().unwrap());

    let response = server.put(&bob, &path, json!({ "status": "pending" })).await;
    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "Invalid status");

    let response = server.put(&bob, &path, json!({ "status": "declined" })).await;
    assert_eq!(response.status(), 200);

    let response = server.put(&bob, &path, json!({ "status": "accepted" })).await;
    assert_eq!(response.status(), 400);

    let response = server
        .put(&bob, "/api/connections/missing", json!({ "status": "accepted" }))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_declined_pair_blocks_rerequest_by_default() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;

    let connection = request_connection(&server, &alice, "bob").await;
    server
        .put(
            &bob,
            &format!("/api/connections/{}", connection["id"].as_str().unwrap()),
            json!({ "status": "declined" }),
        )
        .await;

    for token in [&alice, &bob] {
        let connections: Vec<Value> = server
            .get(token, "/api/connections")
            .await
            .json()
            .await
            .unwrap();
        assert!(connections.is_empty());
    }

    let response = server
        .post(&alice, "/api/connections", json!({ "receiverId": "bob" }))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_declined_pair_can_rerequest_when_enabled() {
    let server = TestServer::with_config(|config| {
        config.connections.allow_rerequest_after_decline = true;
    })
    .await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;

    let connection = request_connection(&server, &alice, "bob").await;
    server
        .put(
            &bob,
            &format!("/api/connections/{}", connection["id"].as_str().unwrap()),
            json!({ "status": "declined" }),
        )
        .await;

    let reopened = request_connection(&server, &bob, "alice").await;
    assert_eq!(reopened["id"], connection["id"]);
    assert_eq!(reopened["requesterId"], "bob");
    assert_eq!(reopened["status"], "pending");
}

#[tokio::test]
async fn test_connection_status_between_users() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;

    let status: Value = server
        .get(&alice, "/api/connections/status/bob")
        .await
        .json()
        .await
        .unwrap();
    assert!(status.is_null());

    request_connection(&server, &alice, "bob").await;

    let status: Value = server
        .get(&bob, "/api/connections/status/alice")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "pending");
    assert_eq!(status["requesterId"], "alice");
}
