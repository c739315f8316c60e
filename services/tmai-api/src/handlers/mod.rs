//! Axum request handlers.

mod chat;
mod health;
mod ingest;
mod keys;
mod services;

pub use chat::chat;
pub use health::health_check;
pub use ingest::ingest_document;
pub use keys::{delete_key, issue_key, list_keys, revoke_key};
pub use services::create_service;
