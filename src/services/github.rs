//! GitHub-style API: users, repositories and their issues, pull requests,
//! commits, forks and stars.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use bson::doc;
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
        ("repositories", DefaultValue::EmptyList),
        ("followers", DefaultValue::Int(0)),
        ("following", DefaultValue::Int(0)),
        ("isVerified", DefaultValue::Bool(false)),
    ],
    delete_scope: DeleteScope::One,
    counter: None,
};

pub static REPOSITORIES: Entity = Entity {
    name: "Repository",
    collection: "repositories",
    id_field: "repoId",
    require_id: true,
    scope_field: None,
    defaults: &[
        ("stars", DefaultValue::Int(0)),
        ("forks", DefaultValue::Int(0)),
        ("issues", DefaultValue::EmptyList),
        ("pullRequests", DefaultValue::EmptyList),
        ("createdAt", DefaultValue::Now),
    ],
    delete_scope: DeleteScope::One,
    counter: None,
};

pub static ISSUES: Entity = Entity {
    name: "Issue",
    collection: "issues",
    id_field: "issueId",
    require_id: true,
    scope_field: Some("repoId"),
    defaults: &[
        ("status", DefaultValue::Str("open")),
        ("createdAt", DefaultValue::Now),
        ("closedAt", DefaultValue::Null),
    ],
    delete_scope: DeleteScope::One,
    counter: None,
};

pub static PULL_REQUESTS: Entity = Entity {
    name: "Pull request",
    collection: "pullRequests",
    id_field: "prId",
    require_id: true,
    scope_field: Some("repoId"),
    defaults: &[
        ("status", DefaultValue::Str("open")),
        ("createdAt", DefaultValue::Now),
        ("mergedAt", DefaultValue::Null),
    ],
    delete_scope: DeleteScope::One,
    counter: None,
};

pub static COMMITS: Entity = Entity {
    name: "Commit",
    collection: "commits",
    id_field: "commitId",
    require_id: true,
    scope_field: Some("repoId"),
    defaults: &[("createdAt", DefaultValue::Now)],
    delete_scope: DeleteScope::One,
    counter: None,
};

pub static FORKS: Entity = Entity {
    name: "Fork",
    collection: "forks",
    id_field: "forkId",
    require_id: false,
    scope_field: None,
    defaults: &[("forkedAt", DefaultValue::Now)],
    delete_scope: DeleteScope::One,
    counter: Some(CounterLink {
        target: &REPOSITORIES,
        link_field: "repoId",
        counter: "forks",
    }),
};

pub static STARS: Entity = Entity {
    name: "Star",
    collection: "stars",
    id_field: "starId",
    require_id: false,
    scope_field: None,
    defaults: &[("starredAt", DefaultValue::Now)],
    delete_scope: DeleteScope::One,
    counter: Some(CounterLink {
        target: &REPOSITORIES,
        link_field: "repoId",
        counter: "stars",
    }),
};

/// Body of the status endpoints. Any string is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Core status-change logic for issues and pull requests.
pub async fn process_status_change(
    store: &dyn DocumentStore,
    entity: &Entity,
    id: &str,
    status: String,
) -> Result<UpdatedResponse, AppError> {
    crud::process_field_update(
        store,
        entity,
        id,
        Update::set(doc! { "status": status }),
        format!("{} status updated", entity.name),
    )
    .await
}

/// Axum handler for `PATCH /issues/{issueId}/status` and `PATCH /pull-requests/{prId}/status`.
pub async fn status_handler(
    State(state): State<EntityState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let Json(request) = payload?;
    let response =
        process_status_change(state.store.as_ref(), state.entity, &id, request.status).await?;
    Ok(Json(response))
}

/// Issues, pull requests and commits share one shape: listed under their
/// repository, created flat, deleted by their own id.
fn repository_child_routes(
    store: Arc<dyn DocumentStore>,
    entity: &'static Entity,
    list_path: &str,
    collection_path: &str,
    item_path: &str,
) -> Router {
    Router::new()
        .route(list_path, get(crud::list_scoped_handler))
        .route(collection_path, post(crud::create_handler))
        .route(item_path, delete(crud::delete_handler))
        .with_state(EntityState::new(store, entity))
}

pub fn routes(store: Arc<dyn DocumentStore>) -> Router {
    let users = crud_routes("/users", "/users/{userId}")
        .with_state(EntityState::new(store.clone(), &USERS));

    let repositories = crud_routes("/repositories", "/repositories/{repoId}")
        .with_state(EntityState::new(store.clone(), &REPOSITORIES));

    let issues = repository_child_routes(
        store.clone(),
        &ISSUES,
        "/repositories/{repoId}/issues",
        "/issues",
        "/issues/{issueId}",
    )
    .merge(
        Router::new()
            .route("/issues/{issueId}/status", patch(status_handler))
            .with_state(EntityState::new(store.clone(), &ISSUES)),
    );

    let pull_requests = repository_child_routes(
        store.clone(),
        &PULL_REQUESTS,
        "/repositories/{repoId}/pull-requests",
        "/pull-requests",
        "/pull-requests/{prId}",
    )
    .merge(
        Router::new()
            .route("/pull-requests/{prId}/status", patch(status_handler))
            .with_state(EntityState::new(store.clone(), &PULL_REQUESTS)),
    );

    let commits = repository_child_routes(
        store.clone(),
        &COMMITS,
        "/repositories/{repoId}/commits",
        "/commits",
        "/commits/{commitId}",
    );

    let relationships = Router::new()
        .route("/forks", post(crud::create_handler))
        .with_state(EntityState::new(store.clone(), &FORKS))
        .merge(
            Router::new()
                .route("/stars", post(crud::create_handler))
                .with_state(EntityState::new(store, &STARS)),
        );

    Router::new()
        .merge(users)
        .merge(repositories)
        .merge(issues)
        .merge(pull_requests)
        .merge(commits)
        .merge(relationships)
}
