pub mod app;
pub mod config;
pub mod error;
pub mod api {
    pub mod crud;
    pub mod errors;
    pub mod responses;
}
pub mod db {
    pub mod documents;
    pub mod memory;
    pub mod models;
    pub mod repository;
}
pub mod services;
