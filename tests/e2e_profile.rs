//! E2E tests for the current user, profiles, bored status and ratings

mod common;

use common::{TestServer, error_message};
use serde_json::{Value, json};

#[tokio::test]
async fn test_first_request_provisions_user() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", Some("Alice"));

    let response = server.get(&token, "/api/auth/user").await;
    assert_eq!(response.status(), 200);

    let user: Value = response.json().await.unwrap();
    assert_eq!(user["id"], "alice");
    assert_eq!(user["firstName"], "Alice");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["isBored"], false);
    assert_eq!(user["interests"], json!([]));

    assert_eq!(server.state.db.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_profile() {
    let server = TestServer::new().await;
    let token = server.sign_in("alice", "Alice").await;

    let response = server
        .put(
            &token,
            "/api/profile",
            json!({
                "displayName": "Ali",
                "ageGroup": "26-35",
                "locationCity": "Lisbon",
                "shareLocation": true,
                "bio": "Weekend hiker"
            }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let user: Value = response.json().await.unwrap();
    assert_eq!(user["displayName"], "Ali");
    assert_eq!(user["ageGroup"], "26-35");
    assert_eq!(user["locationCity"], "Lisbon");
    assert_eq!(user["shareLocation"], true);
}

#[tokio::test]
async fn test_update_profile_requires_display_name() {
    let server = TestServer::new().await;
    let token = server.sign_in("alice", "Alice").await;

    let response = server
        .put(&token, "/api/profile", json!({ "bio": "no name" }))
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "Display name is required");

    let response = server
        .put(
            &token,
            "/api/profile",
            json!({ "displayName": "Ali", "ageGroup": "teen" }),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_public_profile_lists_interests_and_hobbies() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;

    let interest_id = server.create_interest(&bob, "Chess").await;
    let hobby_id = server.create_hobby(&bob, "Gardening").await;
    server
        .post(&bob, "/api/user-interests", json!({ "interestId": interest_id }))
        .await;
    server
        .post(&bob, "/api/user-hobbies", json!({ "hobbyId": hobby_id }))
        .await;

    let response = server.get(&alice, "/api/users/bob").await;
    assert_eq!(response.status(), 200);
    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["id"], "bob");
    assert_eq!(profile["interests"][0]["name"], "Chess");
    assert_eq!(profile["hobbies"][0]["name"], "Gardening");
    assert_eq!(profile["hobbies"][0]["userHobby"]["experienceLevel"], "beginner");

    let response = server.get(&alice, "/api/users/nobody").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_bored_status_and_bored_users() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;

    let response = server
        .post(&bob, "/api/user-bored-status", json!({ "isBored": true }))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["isBored"], true);
    assert_eq!(body["user"]["isBored"], true);

    let bored: Vec<Value> = server
        .get(&alice, "/api/bored-users")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(bored.len(), 1);
    assert_eq!(bored[0]["id"], "bob");

    let response = server.post(&bob, "/api/user-bored-status", json!({})).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_rating_updates_aggregates() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    server.sign_in("bob", "Bob").await;

    let response = server
        .post(
            &alice,
            "/api/users/bob/ratings",
            json!({ "rating": 4, "experienceType": "reliability", "comment": "On time" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let profile: Value = server.get(&alice, "/api/users/bob").await.json().await.unwrap();
    assert_eq!(profile["totalRatings"], 1);
    assert_eq!(profile["averageRating"], 4.0);

    let ratings: Vec<Value> = server
        .get(&alice, "/api/users/bob/ratings")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0]["raterId"], "alice");
}

#[tokio::test]
async fn test_rating_validation() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    server.sign_in("bob", "Bob").await;

    let response = server
        .post(
            &alice,
            "/api/users/alice/ratings",
            json!({ "rating": 5, "experienceType": "safety" }),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "Cannot rate yourself");

    let response = server
        .post(
            &alice,
            "/api/users/bob/ratings",
            json!({ "rating": 6, "experienceType": "safety" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .post(
            &alice,
            "/api/users/bob/ratings",
            json!({ "rating": 3, "experienceType": "vibes" }),
        )
        .await;
    assert_eq!(response.status(), 400);
}
