#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mongo::Mongo;

use clonehub::app::build_router;
use clonehub::db::memory::InMemoryDocumentStore;
use clonehub::db::repository::{DocumentStore, MongoDocumentStore};
use clonehub::services::Service;

/// One service's router over a fresh in-memory store.
pub struct TestEnv {
    pub router: Router,
    pub store: Arc<dyn DocumentStore>,
}

impl TestEnv {
    pub fn start(service: Service) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        Self::with_store(service, store)
    }

    pub fn with_store(service: Service, store: Arc<dyn DocumentStore>) -> Self {
        let router = build_router(service, store.clone(), Duration::from_secs(10));
        Self { router, store }
    }

    /// Build an `axum_test::TestServer` from this environment's router.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .expect_success_by_default()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }
}

/// A MongoDB container plus a store bound to a throwaway database.
///
/// The container is stopped when this struct is dropped.
pub struct MongoEnv {
    _mongo: ContainerAsync<Mongo>,
    pub client: mongodb::Client,
    pub database: String,
    pub store: Arc<dyn DocumentStore>,
}

impl MongoEnv {
    /// Standalone server; counter side effects go through the compensating saga.
    pub async fn start() -> Self {
        Self::launch(Mongo::default(), false).await
    }

    /// Single-node replica set; counter side effects run in a transaction.
    pub async fn start_repl_set() -> Self {
        Self::launch(Mongo::repl_set(), true).await
    }

    async fn launch(image: Mongo, transactions: bool) -> Self {
        let mongo_container = image
            .start()
            .await
            .expect("Failed to start MongoDB container");
        let mongo_port = mongo_container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");
        // The replica set advertises its in-container host name.
        let mongo_uri = format!("mongodb://127.0.0.1:{}/?directConnection=true", mongo_port);
        let client = mongodb::Client::with_uri_str(&mongo_uri)
            .await
            .expect("Failed to connect to MongoDB");

        let database = format!("clonehub_test_{}", uuid::Uuid::new_v4().simple());
        let store: Arc<dyn DocumentStore> = Arc::new(MongoDocumentStore::new(
            client.clone(),
            &database,
            transactions,
        ));

        Self {
            _mongo: mongo_container,
            client,
            database,
            store,
        }
    }
}

/// Helper: POST a JSON body and return the created document's `_id`.
pub async fn create(
    server: &axum_test::TestServer,
    path: &str,
    body: serde_json::Value,
) -> String {
    let response = server.post(path).json(&body).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    created["id"]
        .as_str()
        .expect("create response carries an id")
        .to_string()
}
