//! LinkedIn-style API: users (with skills, premium and profile views),
//! connections, posts and messages.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, patch, put};
use axum::{Json, Router};
use bson::doc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::crud::{self, crud_routes, EntityState};
use crate::api::responses::UpdatedResponse;
use crate::db::documents;
use crate::db::models::{DeleteScope, Entity, Update};
use crate::db::repository::DocumentStore;
use crate::error::AppError;

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

pub static CONNECTIONS: Entity = Entity {
    name: "Connection",
    collection: "connections",
    id_field: "connectionId",
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

pub static MESSAGES: Entity = Entity {
    name: "Message",
    collection: "messages",
    id_field: "messageId",
    require_id: true,
    scope_field: None,
    defaults: &[],
    delete_scope: DeleteScope::Many,
    counter: None,
};

/// Body of `PUT /users/{userId}/skills`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRequest {
    pub skill: String,
}

/// Response of `GET /users/{userId}/profile-views`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewsResponse {
    /// `null` when the user has no `profileViews` field.
    pub profile_views: Value,
}

/// Core profile-views logic: the single projected field of one user.
pub async fn process_profile_views(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<ProfileViewsResponse, AppError> {
    let user = store
        .find_first(USERS.collection, USERS.id_field, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(USERS.name))?;

    let profile_views = user
        .get("profileViews")
        .cloned()
        .map(documents::bson_to_json)
        .unwrap_or(Value::Null);

    Ok(ProfileViewsResponse { profile_views })
}

/// Core skill-append logic; duplicates are kept, like any `$push`.
pub async fn process_add_skill(
    store: &dyn DocumentStore,
    user_id: &str,
    skill: String,
) -> Result<UpdatedResponse, AppError> {
    if skill.trim().is_empty() {
        return Err(AppError::BadRequest("skill cannot be empty".into()));
    }

    crud::process_field_update(
        store,
        &USERS,
        user_id,
        Update::push("skills", skill),
        "Skill added".to_string(),
    )
    .await
}

/// Core premium-upgrade logic.
pub async fn process_upgrade_premium(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<UpdatedResponse, AppError> {
    crud::process_field_update(
        store,
        &USERS,
        user_id,
        Update::set(doc! { "isPremium": true }),
        "User upgraded to premium".to_string(),
    )
    .await
}

/// Axum handler for `GET /users/{userId}/profile-views`.
pub async fn profile_views_handler(
    State(state): State<EntityState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileViewsResponse>, AppError> {
    Ok(Json(
        process_profile_views(state.store.as_ref(), &user_id).await?,
    ))
}

/// Axum handler for `PUT /users/{userId}/skills`.
pub async fn add_skill_handler(
    State(state): State<EntityState>,
    Path(user_id): Path<String>,
    payload: Result<Json<SkillRequest>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let Json(request) = payload?;
    Ok(Json(
        process_add_skill(state.store.as_ref(), &user_id, request.skill).await?,
    ))
}

/// Axum handler for `PATCH /users/{userId}/premium`.
pub async fn upgrade_premium_handler(
    State(state): State<EntityState>,
    Path(user_id): Path<String>,
) -> Result<Json<UpdatedResponse>, AppError> {
    Ok(Json(
        process_upgrade_premium(state.store.as_ref(), &user_id).await?,
    ))
}

pub fn routes(store: Arc<dyn DocumentStore>) -> Router {
    let users = crud_routes("/users", "/users/{userId}")
        .route("/users/{userId}/profile-views", get(profile_views_handler))
        .route("/users/{userId}/skills", put(add_skill_handler))
        .route("/users/{userId}/premium", patch(upgrade_premium_handler))
        .with_state(EntityState::new(store.clone(), &USERS));

    let connections = Router::new()
        .route(
            "/connections",
            get(crud::list_handler).post(crud::create_handler),
        )
        .route(
            "/connections/{connectionId}",
            patch(crud::update_handler).delete(crud::delete_handler),
        )
        .with_state(EntityState::new(store.clone(), &CONNECTIONS));

    let posts = crud_routes("/posts", "/posts/{postId}")
        .with_state(EntityState::new(store.clone(), &POSTS));

    let messages = Router::new()
        .route(
            "/messages",
            get(crud::list_handler).post(crud::create_handler),
        )
        .route("/messages/{messageId}", delete(crud::delete_handler))
        .with_state(EntityState::new(store, &MESSAGES));

    Router::new()
        .merge(users)
        .merge(connections)
        .merge(posts)
        .merge(messages)
}
