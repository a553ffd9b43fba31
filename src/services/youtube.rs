//! YouTube-style API: users (channels), videos, comments, playlists and
//! subscriptions.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::crud::{self, crud_routes, EntityState};
use crate::api::responses::UpdatedResponse;
use crate::db::models::{CounterLink, DefaultValue, DeleteScope, Entity, Update};
use crate::db::repository::DocumentStore;
use crate::error::AppError;

pub static USERS: Entity = Entity {
    name: "User",
    collection: "users",
    id_field: "userId",
    require_id: true,
    scope_field: None,
    defaults: &[
        ("subscribers", DefaultValue::Int(0)),
        ("joinedDate", DefaultValue::Now),
    ],
    delete_scope: DeleteScope::One,
    counter: None,
};

pub static VIDEOS: Entity = Entity {
    name: "Video",
    collection: "videos",
    id_field: "videoId",
    require_id: true,
    scope_field: None,
    defaults: &[
        ("views", DefaultValue::Int(0)),
        ("likes", DefaultValue::Int(0)),
        ("dislikes", DefaultValue::Int(0)),
        ("uploadDate", DefaultValue::Now),
    ],
    delete_scope: DeleteScope::One,
    counter: None,
};

pub static COMMENTS: Entity = Entity {
    name: "Comment",
    collection: "comments",
    id_field: "commentId",
    require_id: true,
    scope_field: Some("videoId"),
    defaults: &[
        ("likes", DefaultValue::Int(0)),
        ("postedAt", DefaultValue::Now),
    ],
    delete_scope: DeleteScope::One,
    counter: None,
};

pub static PLAYLISTS: Entity = Entity {
    name: "Playlist",
    collection: "playlists",
    id_field: "playlistId",
    require_id: true,
    scope_field: Some("userId"),
    defaults: &[
        ("videos", DefaultValue::EmptyList),
        ("createdDate", DefaultValue::Now),
    ],
    delete_scope: DeleteScope::One,
    counter: None,
};

pub static SUBSCRIPTIONS: Entity = Entity {
    name: "Subscription",
    collection: "subscriptions",
    id_field: "subscriptionId",
    require_id: false,
    scope_field: Some("subscriber"),
    defaults: &[("subscribedAt", DefaultValue::Now)],
    delete_scope: DeleteScope::One,
    counter: Some(CounterLink {
        target: &USERS,
        link_field: "channel",
        counter: "subscribers",
    }),
};

/// Body of `PUT /playlists/{playlistId}/videos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddVideoRequest {
    pub video_id: String,
}

/// Core like logic: one more like per call, never idempotent.
pub async fn process_like(
    store: &dyn DocumentStore,
    entity: &Entity,
    id: &str,
) -> Result<UpdatedResponse, AppError> {
    crud::process_field_update(
        store,
        entity,
        id,
        Update::increment("likes", 1),
        format!("{} liked", entity.name),
    )
    .await
}

/// Core playlist-append logic. The video id is not checked against `videos`.
pub async fn process_add_to_playlist(
    store: &dyn DocumentStore,
    playlist_id: &str,
    video_id: String,
) -> Result<UpdatedResponse, AppError> {
    if video_id.trim().is_empty() {
        return Err(AppError::BadRequest("videoId cannot be empty".into()));
    }

    crud::process_field_update(
        store,
        &PLAYLISTS,
        playlist_id,
        Update::push("videos", video_id),
        "Video added to playlist".to_string(),
    )
    .await
}

/// Axum handler for `PATCH /videos/{videoId}/likes` and `PATCH /comments/{commentId}/likes`.
pub async fn like_handler(
    State(state): State<EntityState>,
    Path(id): Path<String>,
) -> Result<Json<UpdatedResponse>, AppError> {
    Ok(Json(
        process_like(state.store.as_ref(), state.entity, &id).await?,
    ))
}

/// Axum handler for `PUT /playlists/{playlistId}/videos`.
pub async fn add_to_playlist_handler(
    State(state): State<EntityState>,
    Path(playlist_id): Path<String>,
    payload: Result<Json<AddVideoRequest>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let Json(request) = payload?;
    Ok(Json(
        process_add_to_playlist(state.store.as_ref(), &playlist_id, request.video_id).await?,
    ))
}

pub fn routes(store: Arc<dyn DocumentStore>) -> Router {
    let users = crud_routes("/users", "/users/{userId}")
        .with_state(EntityState::new(store.clone(), &USERS));

    let videos = Router::new()
        .route(
            "/videos",
            get(crud::list_handler).post(crud::create_handler),
        )
        .route(
            "/videos/{videoId}",
            get(crud::get_handler).delete(crud::delete_handler),
        )
        .route("/videos/{videoId}/likes", patch(like_handler))
        .with_state(EntityState::new(store.clone(), &VIDEOS));

    let comments = Router::new()
        .route(
            "/videos/{videoId}/comments",
            get(crud::list_scoped_handler),
        )
        .route("/comments", post(crud::create_handler))
        .route("/comments/{commentId}", delete(crud::delete_handler))
        .route("/comments/{commentId}/likes", patch(like_handler))
        .with_state(EntityState::new(store.clone(), &COMMENTS));

    // GET lists a user's playlists while DELETE removes one playlist; both
    // share the `/playlists/{id}` template.
    let playlists = Router::new()
        .route("/playlists", post(crud::create_handler))
        .route(
            "/playlists/{id}",
            get(crud::list_scoped_handler).delete(crud::delete_handler),
        )
        .route("/playlists/{id}/videos", put(add_to_playlist_handler))
        .with_state(EntityState::new(store.clone(), &PLAYLISTS));

    let subscriptions = Router::new()
        .route("/subscriptions", post(crud::create_handler))
        .route(
            "/subscriptions/{userId}",
            get(crud::list_scoped_handler),
        )
        .with_state(EntityState::new(store, &SUBSCRIPTIONS));

    Router::new()
        .merge(users)
        .merge(videos)
        .merge(comments)
        .merge(playlists)
        .merge(subscriptions)
}
