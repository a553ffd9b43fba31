//! MongoDB-backed store tests. They start a container and are skipped unless
//! run with `--ignored` on a machine with Docker.

mod common;

use bson::doc;
use clonehub::db::models::{DeleteScope, Update};
use clonehub::db::repository::DocumentStore;
use clonehub::error::AppError;
use clonehub::services::{github, Service};
use serde_json::{json, Value};

#[tokio::test]
#[ignore = "requires Docker"]
async fn mongo_store_keeps_insertion_order_and_first_match() {
    let env = common::MongoEnv::start().await;
    let store = env.store.as_ref();

    let first = store
        .insert("users", doc! { "userId": "dup", "name": "first" })
        .await
        .unwrap();
    store
        .insert("users", doc! { "userId": "dup", "name": "second" })
        .await
        .unwrap();
    store
        .insert("users", doc! { "userId": "solo" })
        .await
        .unwrap();

    let all = store.find_all("users").await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].get_object_id("_id").unwrap(), first);

    let found = store.find_first("users", "userId", "dup").await.unwrap().unwrap();
    assert_eq!(found.get_str("name").unwrap(), "first");

    let outcome = store
        .update_first("users", "userId", "dup", Update::set(doc! { "name": "first" }))
        .await
        .unwrap();
    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.modified, 0);

    let deleted = store
        .delete("users", "userId", "dup", DeleteScope::Many)
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    assert!(store.find_many("users", "userId", "dup").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn mongo_store_increment_and_push() {
    let env = common::MongoEnv::start().await;
    let store = env.store.as_ref();

    store
        .insert("videos", doc! { "videoId": "v1", "likes": 3_i64 })
        .await
        .unwrap();
    for _ in 0..2 {
        store
            .update_first("videos", "videoId", "v1", Update::increment("likes", 1))
            .await
            .unwrap();
    }
    store
        .update_first("videos", "videoId", "v1", Update::push("tags", "intro"))
        .await
        .unwrap();

    let video = store.find_first("videos", "videoId", "v1").await.unwrap().unwrap();
    assert_eq!(video.get_i64("likes").unwrap(), 5);
    assert_eq!(video.get_array("tags").unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn mongo_store_compensates_missing_counter_target() {
    let env = common::MongoEnv::start().await;
    let store = env.store.as_ref();

    let Some(link) = github::STARS.counter.as_ref() else {
        panic!("stars carry a counter link");
    };

    let result = store
        .insert_linked("stars", doc! { "repoId": "ghost" }, link, "ghost")
        .await;
    match result.unwrap_err() {
        AppError::NotFound(msg) => assert_eq!(msg, "Repository not found"),
        other => panic!("Expected NotFound error, got: {:?}", other),
    }
    assert!(store.find_all("stars").await.unwrap().is_empty());

    store
        .insert("repositories", doc! { "repoId": "r1", "stars": 0_i64 })
        .await
        .unwrap();
    store
        .insert_linked("stars", doc! { "repoId": "r1" }, link, "r1")
        .await
        .unwrap();
    let repo = store
        .find_first("repositories", "repoId", "r1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(repo.get_i64("stars").unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn github_api_over_mongo() {
    let mongo = common::MongoEnv::start().await;
    let env = common::TestEnv::with_store(Service::Github, mongo.store.clone());
    let server = env.server();

    common::create(&server, "/repositories", json!({ "repoId": "r1" })).await;
    common::create(&server, "/stars", json!({ "repoId": "r1", "userId": "u1" })).await;

    let repo: Value = server.get("/repositories/r1").await.json();
    assert_eq!(repo["stars"], 1);
    assert!(repo["createdAt"].as_str().unwrap().ends_with('Z'));

    let raw = mongo
        .client
        .database(&mongo.database)
        .collection::<bson::Document>("stars")
        .count_documents(doc! {})
        .await
        .unwrap();
    assert_eq!(raw, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn mongo_store_update_targets_the_document_get_returns() {
    let env = common::MongoEnv::start().await;
    let store = env.store.as_ref();

    for name in ["first", "second"] {
        store
            .insert("users", doc! { "userId": "dup", "name": name })
            .await
            .unwrap();
    }

    store
        .update_first("users", "userId", "dup", Update::set(doc! { "bio": "edited" }))
        .await
        .unwrap();

    let found = store.find_first("users", "userId", "dup").await.unwrap().unwrap();
    assert_eq!(found.get_str("name").unwrap(), "first");
    assert_eq!(found.get_str("bio").unwrap(), "edited");

    let missing = store
        .update_first("users", "userId", "ghost", Update::set(doc! { "bio": "x" }))
        .await
        .unwrap();
    assert_eq!(missing.matched, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn transactional_star_on_missing_repository_writes_nothing() {
    let env = common::MongoEnv::start_repl_set().await;
    let store = env.store.as_ref();

    let Some(link) = github::STARS.counter.as_ref() else {
        panic!("stars carry a counter link");
    };

    let result = store
        .insert_linked("stars", doc! { "repoId": "ghost" }, link, "ghost")
        .await;
    match result.unwrap_err() {
        AppError::NotFound(msg) => assert_eq!(msg, "Repository not found"),
        other => panic!("Expected NotFound error, got: {:?}", other),
    }

    let stars = env
        .client
        .database(&env.database)
        .collection::<bson::Document>("stars")
        .count_documents(doc! {})
        .await
        .unwrap();
    assert_eq!(stars, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn transactional_star_increments_repository() {
    let env = common::MongoEnv::start_repl_set().await;
    let store = env.store.as_ref();

    let Some(link) = github::STARS.counter.as_ref() else {
        panic!("stars carry a counter link");
    };

    store
        .insert("repositories", doc! { "repoId": "r1", "stars": 0_i64 })
        .await
        .unwrap();
    for _ in 0..2 {
        store
            .insert_linked("stars", doc! { "repoId": "r1" }, link, "r1")
            .await
            .unwrap();
    }

    let repo = store
        .find_first("repositories", "repoId", "r1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(repo.get_i64("stars").unwrap(), 2);
    assert_eq!(store.find_all("stars").await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn transactional_star_aborts_on_non_numeric_counter() {
    let env = common::MongoEnv::start_repl_set().await;
    let store = env.store.as_ref();

    let Some(link) = github::STARS.counter.as_ref() else {
        panic!("stars carry a counter link");
    };

    store
        .insert("repositories", doc! { "repoId": "r1", "stars": "many" })
        .await
        .unwrap();

    let result = store
        .insert_linked("stars", doc! { "repoId": "r1" }, link, "r1")
        .await;
    assert!(matches!(result, Err(AppError::Database(_))));
    assert!(store.find_all("stars").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn youtube_subscriptions_over_replica_set() {
    let mongo = common::MongoEnv::start_repl_set().await;
    let env = common::TestEnv::with_store(Service::Youtube, mongo.store.clone());

    common::create(&env.server(), "/users", json!({ "userId": "chan" })).await;
    common::create(
        &env.server(),
        "/subscriptions",
        json!({ "subscriber": "u2", "channel": "chan" }),
    )
    .await;

    let channel: Value = env.server().get("/users/chan").await.json();
    assert_eq!(channel["subscribers"], 1);

    env.server_permissive()
        .post("/subscriptions")
        .json(&json!({ "subscriber": "u2", "channel": "ghost" }))
        .await
        .assert_status_not_found();
    let subscriptions: Vec<Value> = env.server().get("/subscriptions/u2").await.json();
    assert_eq!(subscriptions.len(), 1);
}
