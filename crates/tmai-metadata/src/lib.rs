//! SQLite metadata adapters for the TMAI control plane.

mod api_key_repository;
mod document_repository;
mod service_catalog;
mod usage_counter_store;
mod util;

pub use api_key_repository::SqliteApiKeyRepository;
pub use document_repository::SqliteDocumentRepository;
pub use service_catalog::SqliteServiceCatalog;
pub use usage_counter_store::SqliteUsageCounterStore;
pub use util::{create_sqlite_pool, run_migrations};

/// Embedded SQL migrations for the metadata database.
pub const MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
