//! The four clone APIs. Each module declares its entities and its route table.

use std::fmt;
use std::sync::Arc;

use axum::Router;
use serde::Deserialize;

use crate::db::repository::DocumentStore;

pub mod github;
pub mod instagram;
pub mod linkedin;
pub mod youtube;

/// Which clone API this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Github,
    Instagram,
    Linkedin,
    Youtube,
}

impl Service {
    /// Database used when none is configured.
    pub fn default_database(self) -> &'static str {
        match self {
            Service::Github => "github_clone",
            Service::Instagram => "instagram_crud",
            Service::Linkedin => "linkedin_crud",
            Service::Youtube => "youtube_clone",
        }
    }

    /// The service's route table, bound to `store`.
    pub fn routes(self, store: Arc<dyn DocumentStore>) -> Router {
        match self {
            Service::Github => github::routes(store),
            Service::Instagram => instagram::routes(store),
            Service::Linkedin => linkedin::routes(store),
            Service::Youtube => youtube::routes(store),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Github => "github",
            Service::Instagram => "instagram",
            Service::Linkedin => "linkedin",
            Service::Youtube => "youtube",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_databases() {
        assert_eq!(Service::Github.default_database(), "github_clone");
        assert_eq!(Service::Instagram.default_database(), "instagram_crud");
        assert_eq!(Service::Linkedin.default_database(), "linkedin_crud");
        assert_eq!(Service::Youtube.default_database(), "youtube_clone");
    }

    #[test]
    fn test_service_deserializes_lowercase() {
        let service: Service = serde_json::from_str("\"youtube\"").unwrap();
        assert_eq!(service, Service::Youtube);
        assert_eq!(service.to_string(), "youtube");
    }
}
