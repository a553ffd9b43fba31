use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::services::Service;

/// Base name of the optional configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "clonehub";

/// Prefix of the nested environment overrides (`CLONEHUB__STORE__URI`, ...).
pub const ENV_PREFIX: &str = "CLONEHUB";

/// Process configuration, layered from defaults, an optional file and the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    /// Process-local, lost on exit.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub uri: String,
    /// Overrides the service's own database name.
    pub database: Option<String>,
    /// Run counter side effects in a MongoDB transaction. Needs a replica set.
    pub transactions: bool,
    pub connect_timeout_ms: u64,
}

impl AppConfig {
    /// Load the configuration.
    ///
    /// With `path` the file must exist; without it `clonehub.toml` (or any
    /// other format the `config` crate knows) is used when present.
    /// `MONGODB_URI` and `MONGODB_DATABASE` win over everything else.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        defaults()?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("store.uri", std::env::var("MONGODB_URI").ok())?
            .set_override_option("store.database", std::env::var("MONGODB_DATABASE").ok())?
            .build()?
            .try_deserialize()
    }

    /// Database the given service stores its collections in.
    pub fn database_for(&self, service: Service) -> String {
        self.store
            .database
            .clone()
            .unwrap_or_else(|| service.default_database().to_string())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.store.connect_timeout_ms)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000_i64)?
        .set_default("server.request_timeout_ms", 30_000_i64)?
        .set_default("store.backend", "mongo")?
        .set_default("store.uri", "mongodb://localhost:27017")?
        .set_default("store.transactions", false)?
        .set_default("store.connect_timeout_ms", 5_000_i64)?
        .set_default("log_filter", "clonehub=info,tower_http=info")
}
