use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use mongodb::options::ClientOptions;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, StoreBackend};
use crate::db::memory::InMemoryDocumentStore;
use crate::db::repository::{DocumentStore, MongoDocumentStore};
use crate::services::Service;

/// Build the HTTP router for `service`, with request tracing and the request timeout.
pub fn build_router(
    service: Service,
    store: Arc<dyn DocumentStore>,
    request_timeout: Duration,
) -> Router {
    service.routes(store).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(request_timeout)),
    )
}

/// Open the configured store and make sure it answers before serving.
pub async fn connect_store(
    config: &AppConfig,
    service: Service,
) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on exit");
            Arc::new(InMemoryDocumentStore::new())
        }
        StoreBackend::Mongo => {
            let mut options = ClientOptions::parse(&config.store.uri)
                .await
                .with_context(|| format!("Invalid MongoDB URI {}", config.store.uri))?;
            options.app_name = Some(format!("clonehub-{service}"));
            options.connect_timeout = Some(config.connect_timeout());
            options.server_selection_timeout = Some(config.connect_timeout());

            let client =
                mongodb::Client::with_options(options).context("Failed to build MongoDB client")?;
            let database = config.database_for(service);
            tracing::info!(
                database = %database,
                transactions = config.store.transactions,
                "Using MongoDB store"
            );
            Arc::new(MongoDocumentStore::new(
                client,
                &database,
                config.store.transactions,
            ))
        }
    };

    store
        .ping()
        .await
        .context("Document store is not reachable")?;

    Ok(store)
}
