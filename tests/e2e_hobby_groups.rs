//! E2E tests for hobby groups

mod common;

use common::{TestServer, error_message};
use serde_json::{Value, json};

async fn create_group(server: &TestServer, token: &str, hobby_id: &str, max_members: i64) -> Value {
    let response = server
        .post(
            token,
            "/api/hobby-groups",
            json!({
                "hobbyId": hobby_id,
                "name": "Trail crew",
                "maxMembers": max_members,
                "targetAgeGroup": "mixed",
                "meetingSchedule": { "day": "saturday" }
            }),
        )
        .await;
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_creator_counts_as_first_member() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let hiking = server.create_hobby(&alice, "Hiking").await;

    let group = create_group(&server, &alice, &hiking, 5).await;
    assert_eq!(group["currentMembers"], 1);
    assert_eq!(group["maxMembers"], 5);
    assert_eq!(group["targetAgeGroup"], "mixed");

    let mine: Vec<Value> = server
        .get(&alice, "/api/my-hobby-groups")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["role"], "organizer");
    assert_eq!(mine[0]["hobby"]["name"], "Hiking");
    assert_eq!(mine[0]["memberCount"], 1);
    assert_eq!(mine[0]["creator"]["id"], "alice");
    assert_eq!(mine[0]["creator"]["firstName"], "Alice");
}

#[tokio::test]
async fn test_join_increments_current_members() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;
    let hiking = server.create_hobby(&alice, "Hiking").await;

    let group = create_group(&server, &alice, &hiking, 5).await;
    let group_id = group["id"].as_str().unwrap();
    let before = group["currentMembers"].as_i64().unwrap();

    let response = server
        .post(&bob, &format!("/api/hobby-groups/{}/join", group_id), json!({}))
        .await;
    assert_eq!(response.status(), 200);
    let joined: Value = response.json().await.unwrap();
    assert_eq!(joined["currentMembers"].as_i64().unwrap(), before + 1);

    let members: Vec<Value> = server
        .client
        .get(server.url(&format!("/api/hobby-groups/{}/members", group_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(members.len(), 2);

    let notifications: Vec<Value> = server
        .get(&alice, "/api/notifications")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(notifications[0]["type"], "hobby_group_joined");
}

#[tokio::test]
async fn test_join_rejects_duplicates_and_full_groups() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;
    let carol = server.sign_in("carol", "Carol").await;
    let hiking = server.create_hobby(&alice, "Hiking").await;

    let group = create_group(&server, &alice, &hiking, 2).await;
    let path = format!("/api/hobby-groups/{}/join", group["id"].as_str().unwrap());

    assert_eq!(server.post(&bob, &path, json!({})).await.status(), 200);

    let response = server.post(&bob, &path, json!({})).await;
    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "Already a member of this group");

    let response = server.post(&carol, &path, json!({})).await;
    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "Group is full");

    let response = server
        .post(&carol, "/api/hobby-groups/missing/join", json!({}))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_concurrent_joins_respect_capacity() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;
    let carol = server.sign_in("carol", "Carol").await;
    let hiking = server.create_hobby(&alice, "Hiking").await;

    let group = create_group(&server, &alice, &hiking, 2).await;
    let group_id = group["id"].as_str().unwrap().to_string();
    let path = format!("/api/hobby-groups/{}/join", group_id);

    let (first, second) = tokio::join!(
        server.post(&bob, &path, json!({})),
        server.post(&carol, &path, json!({})),
    );
    let statuses = [first.status().as_u16(), second.status().as_u16()];
    assert!(statuses.contains(&200));
    assert!(statuses.contains(&400));

    let stored = server
        .state
        .db
        .get_hobby_group(&group_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.current_members, 2);
}

#[tokio::test]
async fn test_leave_recounts_members() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;
    let hiking = server.create_hobby(&alice, "Hiking").await;

    let group = create_group(&server, &alice, &hiking, 5).await;
    let group_id = group["id"].as_str().unwrap();
    server
        .post(&bob, &format!("/api/hobby-groups/{}/join", group_id), json!({}))
        .await;

    let response = server
        .delete(&bob, &format!("/api/hobby-groups/{}/leave", group_id))
        .await;
    assert_eq!(response.status(), 200);

    let groups: Vec<Value> = server
        .client
        .get(server.url(&format!("/api/hobby-groups/hobby/{}", hiking)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["currentMembers"], 1);
    assert_eq!(groups[0]["memberCount"], 1);
}

#[tokio::test]
async fn test_create_validation() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let hiking = server.create_hobby(&alice, "Hiking").await;

    let response = server
        .post(
            &alice,
            "/api/hobby-groups",
            json!({ "hobbyId": hiking, "name": "Solo", "maxMembers": 1 }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .post(&alice, "/api/hobby-groups", json!({ "hobbyId": hiking }))
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .post(
            &alice,
            "/api/hobby-groups",
            json!({ "hobbyId": "missing", "name": "Nowhere" }),
        )
        .await;
    assert_eq!(response.status(), 404);
}
