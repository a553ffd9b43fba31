//! Instagram-style API: users, posts, comments, followers and stories.
//!
//! Child entities are removed with delete-many, so every duplicate sharing an
//! identity value goes at once.

use std::sync::Arc;

use axum::routing::{delete, get, patch};
use axum::Router;

use crate::api::crud::{self, crud_routes, EntityState};
use crate::db::models::{DeleteScope, Entity};
use crate::db::repository::DocumentStore;

pub static USERS: Entity = Entity {
    name: "User",
    collection: "users",
    id_field: "userId",
    require_id: true,
    scope_field: None,
    defaults: &[],
    delete_scope: DeleteScope::One,
    counter: None,
};

pub static POSTS: Entity = Entity {
    name: "Post",
    collection: "posts",
    id_field: "postId",
    require_id: true,
    scope_field: None,
    defaults: &[],
    delete_scope: DeleteScope::Many,
    counter: None,
};

pub static COMMENTS: Entity = Entity {
    name: "Comment",
    collection: "comments",
    id_field: "commentId",
    require_id: true,
    scope_field: None,
    defaults: &[],
    delete_scope: DeleteScope::Many,
    counter: None,
};

pub static FOLLOWERS: Entity = Entity {
    name: "Follower",
    collection: "followers",
    id_field: "followerId",
    require_id: true,
    scope_field: None,
    defaults: &[],
    delete_scope: DeleteScope::Many,
    counter: None,
};

pub static STORIES: Entity = Entity {
    name: "Story",
    collection: "stories",
    id_field: "storyId",
    require_id: true,
    scope_field: None,
    defaults: &[],
    delete_scope: DeleteScope::Many,
    counter: None,
};

/// List and create on the collection, delete by identity.
fn append_only_routes(
    store: Arc<dyn DocumentStore>,
    entity: &'static Entity,
    collection_path: &str,
    item_path: &str,
) -> Router {
    Router::new()
        .route(
            collection_path,
            get(crud::list_handler).post(crud::create_handler),
        )
        .route(item_path, delete(crud::delete_handler))
        .with_state(EntityState::new(store, entity))
}

pub fn routes(store: Arc<dyn DocumentStore>) -> Router {
    let users = crud_routes("/users", "/users/{userId}")
        .with_state(EntityState::new(store.clone(), &USERS));

    let posts = crud_routes("/posts", "/posts/{postId}")
        .with_state(EntityState::new(store.clone(), &POSTS));

    let comments = Router::new()
        .route(
            "/comments",
            get(crud::list_handler).post(crud::create_handler),
        )
        .route(
            "/comments/{commentId}",
            patch(crud::update_handler).delete(crud::delete_handler),
        )
        .with_state(EntityState::new(store.clone(), &COMMENTS));

    let followers = append_only_routes(
        store.clone(),
        &FOLLOWERS,
        "/followers",
        "/followers/{followerId}",
    );

    let stories = append_only_routes(store, &STORIES, "/stories", "/stories/{storyId}");

    Router::new()
        .merge(users)
        .merge(posts)
        .merge(comments)
        .merge(followers)
        .merge(stories)
}
