use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Map, Value};

use crate::api::responses::{CreatedResponse, DeletedResponse, UpdatedResponse};
use crate::db::documents;
use crate::db::models::{Entity, Update};
use crate::db::repository::DocumentStore;
use crate::error::AppError;

/// Handler state for one entity: the shared store plus the entity's definition.
#[derive(Clone)]
pub struct EntityState {
    pub store: Arc<dyn DocumentStore>,
    pub entity: &'static Entity,
}

impl EntityState {
    pub fn new(store: Arc<dyn DocumentStore>, entity: &'static Entity) -> Self {
        Self { store, entity }
    }
}

/// Core list logic: the whole collection, in insertion order.
pub async fn process_list(
    store: &dyn DocumentStore,
    entity: &Entity,
) -> Result<Vec<Value>, AppError> {
    let docs = store.find_all(entity.collection).await?;
    Ok(docs.into_iter().map(documents::to_json).collect())
}

/// Core nested-list logic: every document whose scope field equals `parent`.
pub async fn process_list_scoped(
    store: &dyn DocumentStore,
    entity: &Entity,
    parent: &str,
) -> Result<Vec<Value>, AppError> {
    let scope_field = entity.scope_field.ok_or_else(|| {
        AppError::Internal(format!("{} has no scope field", entity.name))
    })?;

    let docs = store.find_many(entity.collection, scope_field, parent).await?;
    Ok(docs.into_iter().map(documents::to_json).collect())
}

/// Core get-by-identity logic; the first match by insertion order wins.
pub async fn process_get(
    store: &dyn DocumentStore,
    entity: &Entity,
    id: &str,
) -> Result<Value, AppError> {
    store
        .find_first(entity.collection, entity.id_field, id)
        .await?
        .map(documents::to_json)
        .ok_or_else(|| AppError::not_found(entity.name))
}

/// Core create logic.
///
/// Validates presence of the identity, scope and link fields, merges the
/// entity defaults over the body, and inserts. Relationship entities go
/// through [`DocumentStore::insert_linked`] so the counter moves with the insert.
pub async fn process_create(
    store: &dyn DocumentStore,
    entity: &'static Entity,
    body: Map<String, Value>,
) -> Result<CreatedResponse, AppError> {
    let mut doc = documents::from_json(body)?;
    documents::reject_reserved_keys(&doc)?;

    if entity.require_id {
        documents::required_str(&doc, entity.id_field)?;
    }
    if let Some(scope_field) = entity.scope_field {
        documents::required_str(&doc, scope_field)?;
    }

    documents::apply_defaults(&mut doc, entity.defaults);

    let id = match entity.counter.as_ref() {
        Some(link) => {
            let target = documents::required_str(&doc, link.link_field)?.to_string();
            store
                .insert_linked(entity.collection, doc, link, &target)
                .await?
        }
        None => store.insert(entity.collection, doc).await?,
    };

    tracing::debug!(collection = entity.collection, %id, "document created");

    Ok(CreatedResponse {
        message: format!("{} created", entity.name),
        id: id.to_hex(),
    })
}

/// Core partial-update logic (`$set` merge of the body).
pub async fn process_update(
    store: &dyn DocumentStore,
    entity: &Entity,
    id: &str,
    body: Map<String, Value>,
) -> Result<UpdatedResponse, AppError> {
    let fields = documents::from_json(body)?;
    documents::reject_reserved_keys(&fields)?;
    if fields.is_empty() {
        return Err(AppError::BadRequest("Update body cannot be empty".into()));
    }

    process_field_update(
        store,
        entity,
        id,
        Update::set(fields),
        format!("{} updated", entity.name),
    )
    .await
}

/// Apply a single update operator to the entity matched by identity.
///
/// Shared by the generic update and the narrow endpoints (likes, status, ...).
pub async fn process_field_update(
    store: &dyn DocumentStore,
    entity: &Entity,
    id: &str,
    update: Update,
    message: String,
) -> Result<UpdatedResponse, AppError> {
    let outcome = store
        .update_first(entity.collection, entity.id_field, id, update)
        .await?;

    if outcome.matched == 0 {
        return Err(AppError::not_found(entity.name));
    }

    Ok(UpdatedResponse::new(message, outcome))
}

/// Core delete logic; deletes one or many according to the entity's scope.
pub async fn process_delete(
    store: &dyn DocumentStore,
    entity: &Entity,
    id: &str,
) -> Result<DeletedResponse, AppError> {
    let deleted_count = store
        .delete(entity.collection, entity.id_field, id, entity.delete_scope)
        .await?;

    if deleted_count == 0 {
        return Err(AppError::not_found(entity.name));
    }

    Ok(DeletedResponse {
        message: format!("{} deleted", entity.name),
        deleted_count,
    })
}

/// Axum handler for `GET /E`.
pub async fn list_handler(
    State(state): State<EntityState>,
) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(process_list(state.store.as_ref(), state.entity).await?))
}

/// Axum handler for nested lists such as `GET /repositories/{repoId}/issues`.
pub async fn list_scoped_handler(
    State(state): State<EntityState>,
    Path(parent): Path<String>,
) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(
        process_list_scoped(state.store.as_ref(), state.entity, &parent).await?,
    ))
}

/// Axum handler for `GET /E/{id}`.
pub async fn get_handler(
    State(state): State<EntityState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(process_get(state.store.as_ref(), state.entity, &id).await?))
}

/// Axum handler for `POST /E`.
pub async fn create_handler(
    State(state): State<EntityState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let Json(body) = payload?;
    let response = process_create(state.store.as_ref(), state.entity, body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Axum handler for `PATCH /E/{id}`.
pub async fn update_handler(
    State(state): State<EntityState>,
    Path(id): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let Json(body) = payload?;
    Ok(Json(
        process_update(state.store.as_ref(), state.entity, &id, body).await?,
    ))
}

/// Axum handler for `DELETE /E/{id}`.
pub async fn delete_handler(
    State(state): State<EntityState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    Ok(Json(
        process_delete(state.store.as_ref(), state.entity, &id).await?,
    ))
}

/// The full five-endpoint surface: list and create on `collection_path`,
/// get, patch and delete on `item_path`.
pub fn crud_routes(collection_path: &str, item_path: &str) -> Router<EntityState> {
    Router::new()
        .route(collection_path, get(list_handler).post(create_handler))
        .route(
            item_path,
            get(get_handler).patch(update_handler).delete(delete_handler),
        )
}
