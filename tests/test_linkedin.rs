mod common;

use clonehub::api::responses::UpdatedResponse;
use clonehub::services::Service;
use serde_json::{json, Value};

#[tokio::test]
async fn skills_are_appended_in_order() {
    let env = common::TestEnv::start(Service::Linkedin);
    let server = env.server();

    common::create(&server, "/users", json!({ "userId": "u1", "name": "Ada" })).await;

    for skill in ["Rust", "Math", "Rust"] {
        let updated: UpdatedResponse = server
            .put("/users/u1/skills")
            .json(&json!({ "skill": skill }))
            .await
            .json();
        assert_eq!(updated.message, "Skill added");
        assert_eq!(updated.modified_count, 1);
    }

    let user: Value = server.get("/users/u1").await.json();
    assert_eq!(user["skills"], json!(["Rust", "Math", "Rust"]));
}

#[tokio::test]
async fn skill_for_unknown_user_is_not_found() {
    let env = common::TestEnv::start(Service::Linkedin);
    let server = env.server_permissive();

    let response = server
        .put("/users/ghost/skills")
        .json(&json!({ "skill": "Rust" }))
        .await;
    response.assert_status_not_found();
    assert_eq!(response.json::<Value>(), json!({ "error": "User not found" }));

    server
        .put("/users/ghost/skills")
        .json(&json!({ "name": "Rust" }))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn premium_upgrade_is_idempotent() {
    let env = common::TestEnv::start(Service::Linkedin);
    let server = env.server();

    common::create(&server, "/users", json!({ "userId": "u1" })).await;

    let first: UpdatedResponse = server.patch("/users/u1/premium").await.json();
    assert_eq!(first.message, "User upgraded to premium");
    assert_eq!(first.modified_count, 1);

    let second: UpdatedResponse = server.patch("/users/u1/premium").await.json();
    assert_eq!(second.matched_count, 1);
    assert_eq!(second.modified_count, 0);

    let user: Value = server.get("/users/u1").await.json();
    assert_eq!(user["isPremium"], true);
}

#[tokio::test]
async fn profile_views_projection() {
    let env = common::TestEnv::start(Service::Linkedin);
    let server = env.server();

    common::create(
        &server,
        "/users",
        json!({ "userId": "u1", "profileViews": 12, "email": "ada@example.com" }),
    )
    .await;
    common::create(&server, "/users", json!({ "userId": "u2" })).await;

    let views: Value = server.get("/users/u1/profile-views").await.json();
    assert_eq!(views, json!({ "profileViews": 12 }));

    let views: Value = server.get("/users/u2/profile-views").await.json();
    assert_eq!(views, json!({ "profileViews": null }));

    env.server_permissive()
        .get("/users/ghost/profile-views")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn connections_and_messages() {
    let env = common::TestEnv::start(Service::Linkedin);
    let server = env.server();

    common::create(
        &server,
        "/connections",
        json!({ "connectionId": "c1", "from": "u1", "to": "u2", "status": "pending" }),
    )
    .await;
    server
        .patch("/connections/c1")
        .json(&json!({ "status": "accepted" }))
        .await;

    let connections: Vec<Value> = server.get("/connections").await.json();
    assert_eq!(connections[0]["status"], "accepted");

    common::create(&server, "/messages", json!({ "messageId": "m1", "text": "hi" })).await;
    common::create(&server, "/messages", json!({ "messageId": "m1", "text": "hi again" })).await;

    let deleted: Value = server.delete("/messages/m1").await.json();
    assert_eq!(deleted["deletedCount"], 2);

    let messages: Value = server.get("/messages").await.json();
    assert_eq!(messages, json!([]));
}
