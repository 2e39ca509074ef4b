//! E2E tests for catalogs, skills, events, groups and the activity feed

mod common;

use common::{TestServer, error_message};
use serde_json::{Value, json};

#[tokio::test]
async fn test_interest_catalog() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;

    let hiking = server.create_interest(&alice, "Hiking").await;

    let response = server
        .post(&alice, "/api/interests", json!({ "name": "Hiking" }))
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "Interest already exists");

    let response = server.post(&alice, "/api/interests", json!({})).await;
    assert_eq!(response.status(), 400);

    let response = server
        .post(&alice, "/api/user-interests", json!({ "interestId": hiking }))
        .await;
    let interest: Value = response.json().await.unwrap();
    assert_eq!(interest["memberCount"], 1);

    let me: Value = server.get(&alice, "/api/auth/user").await.json().await.unwrap();
    assert_eq!(me["interests"][0]["name"], "Hiking");

    let response = server
        .delete(&alice, &format!("/api/user-interests/{}", hiking))
        .await;
    assert_eq!(response.status(), 200);

    let interests: Vec<Value> = server
        .client
        .get(server.url("/api/interests"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(interests[0]["memberCount"], 0);

    let response = server
        .post(&alice, "/api/user-interests", json!({ "interestId": "missing" }))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_hobby_catalog_and_user_hobbies() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let hiking = server.create_hobby(&alice, "Hiking").await;

    let response = server
        .post(
            &alice,
            "/api/hobbies",
            json!({ "name": "Hiking", "category": "outdoors" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .post(
            &alice,
            "/api/user-hobbies",
            json!({
                "hobbyId": hiking,
                "experienceLevel": "advanced",
                "isLookingForPartners": false
            }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let user_hobby: Value = response.json().await.unwrap();
    assert_eq!(user_hobby["experienceLevel"], "advanced");
    assert_eq!(user_hobby["isLookingForPartners"], false);

    let mine: Vec<Value> = server.get(&alice, "/api/my-hobbies").await.json().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["name"], "Hiking");
    assert_eq!(mine[0]["memberCount"], 1);

    server
        .delete(&alice, &format!("/api/user-hobbies/{}", hiking))
        .await;
    let mine: Vec<Value> = server.get(&alice, "/api/my-hobbies").await.json().await.unwrap();
    assert!(mine.is_empty());
}

#[tokio::test]
async fn test_skill_exchange() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;

    let response = server
        .post(
            &alice,
            "/api/skills",
            json!({ "name": "Guitar", "category": "music" }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let skill: Value = response.json().await.unwrap();
    let skill_id = skill["id"].as_str().unwrap();

    server
        .post(
            &alice,
            "/api/user-skills",
            json!({ "skillId": skill_id, "level": "expert", "isTeaching": true }),
        )
        .await;
    server
        .post(
            &bob,
            "/api/user-skills",
            json!({ "skillId": skill_id, "isLearning": true }),
        )
        .await;

    let teachers: Vec<Value> = server
        .get(&bob, "/api/skill-teachers")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(teachers.len(), 1);
    assert_eq!(teachers[0]["id"], "alice");
    assert_eq!(teachers[0]["skill"]["name"], "Guitar");

    let learners: Vec<Value> = server
        .get(&alice, "/api/skill-learners")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(learners.len(), 1);
    assert_eq!(learners[0]["id"], "bob");

    let mine: Vec<Value> = server.get(&bob, "/api/my-skills").await.json().await.unwrap();
    assert_eq!(mine[0]["userSkill"]["level"], "beginner");

    let response = server
        .post(&bob, "/api/user-skills", json!({ "skillId": skill_id, "level": "guru" }))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_event_attendance_and_capacity() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;
    let carol = server.sign_in("carol", "Carol").await;

    let response = server
        .post(
            &alice,
            "/api/events",
            json!({
                "title": "Picnic",
                "location": "Park",
                "startDate": "2030-06-01T12:00:00Z",
                "maxAttendees": 1,
                "tags": ["outdoors"]
            }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let event: Value = response.json().await.unwrap();
    let event_id = event["id"].as_str().unwrap();
    let join_path = format!("/api/events/{}/join", event_id);

    let response = server.post(&bob, &join_path, json!({})).await;
    assert_eq!(response.status(), 200);
    let attendee: Value = response.json().await.unwrap();
    assert_eq!(attendee["status"], "going");

    let response = server.post(&carol, &join_path, json!({})).await;
    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "Event is full");

    let response = server
        .post(&carol, &join_path, json!({ "status": "maybe" }))
        .await;
    assert_eq!(response.status(), 200);

    let events: Vec<Value> = server.get(&carol, "/api/events").await.json().await.unwrap();
    assert_eq!(events[0]["attendeeCount"], 1);
    assert_eq!(events[0]["creator"]["id"], "alice");

    let mine: Vec<Value> = server.get(&alice, "/api/my-events").await.json().await.unwrap();
    assert_eq!(mine.len(), 1);

    let response = server
        .delete(&bob, &format!("/api/events/{}/leave", event_id))
        .await;
    assert_eq!(response.status(), 200);
    let events: Vec<Value> = server.get(&carol, "/api/events").await.json().await.unwrap();
    assert_eq!(events[0]["attendeeCount"], 0);
}

#[tokio::test]
async fn test_event_validation() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;

    let response = server
        .post(&alice, "/api/events", json!({ "startDate": "2030-06-01T12:00:00Z" }))
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .post(
            &alice,
            "/api/events",
            json!({
                "title": "Backwards",
                "startDate": "2030-06-02T12:00:00Z",
                "endDate": "2030-06-01T12:00:00Z"
            }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .post(&alice, "/api/events/missing/join", json!({}))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_group_membership() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;
    let bob = server.sign_in("bob", "Bob").await;

    let response = server
        .post(&alice, "/api/groups", json!({ "name": "Readers" }))
        .await;
    assert_eq!(response.status(), 200);
    let group: Value = response.json().await.unwrap();
    assert_eq!(group["memberCount"], 1);
    let group_id = group["id"].as_str().unwrap();

    let response = server
        .post(&bob, &format!("/api/groups/{}/join", group_id), json!({}))
        .await;
    assert_eq!(response.status(), 200);
    let joined: Value = response.json().await.unwrap();
    assert_eq!(joined["memberCount"], 2);

    let response = server
        .post(&bob, &format!("/api/groups/{}/join", group_id), json!({}))
        .await;
    assert_eq!(response.status(), 400);

    let mine: Vec<Value> = server.get(&bob, "/api/my-groups").await.json().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["creator"]["id"], "alice");

    server
        .delete(&bob, &format!("/api/groups/{}/leave", group_id))
        .await;
    let groups: Vec<Value> = server.get(&bob, "/api/groups").await.json().await.unwrap();
    assert_eq!(groups[0]["memberCount"], 1);
}

#[tokio::test]
async fn test_activity_feed_records_public_actions() {
    let server = TestServer::new().await;
    let alice = server.sign_in("alice", "Alice").await;

    server
        .post(&alice, "/api/groups", json!({ "name": "Open club" }))
        .await;
    server
        .post(&alice, "/api/groups", json!({ "name": "Secret club", "isPrivate": true }))
        .await;

    let activities: Vec<Value> = server
        .get(&alice, "/api/activities")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0]["type"], "group");
    assert_eq!(activities[0]["user"]["id"], "alice");

    let groups: Vec<Value> = server.get(&alice, "/api/groups").await.json().await.unwrap();
    assert_eq!(groups.len(), 1);
}
