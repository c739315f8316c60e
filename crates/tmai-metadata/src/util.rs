use chrono::{DateTime, Utc};
use sqlx::migrate::MigrateError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use tmai_core::{CoreError, CoreResult};

use crate::MIGRATOR;

/// Creates a SQLite connection pool configured for metadata workloads.
///
/// Foreign keys are enabled so key deletion cascades its usage counters
/// and document deletion cascades its chunks.
pub async fn create_sqlite_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
}

/// Runs all outstanding migrations against the provided connection pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Parses a required RFC 3339 text column into a UTC timestamp.
pub(crate) fn parse_timestamp(row: &SqliteRow, column: &str) -> CoreResult<DateTime<Utc>> {
    let raw: String = row
        .try_get(column)
        .map_err(|e| CoreError::storage(format!("Failed to get {column}: {e}")))?;
    DateTime::parse_from_rfc3339(&raw)
        .map_err(|e| CoreError::storage(format!("Invalid {column}: {e}")))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses an optional RFC 3339 text column into a UTC timestamp.
pub(crate) fn parse_optional_timestamp(
    row: &SqliteRow,
    column: &str,
) -> CoreResult<Option<DateTime<Utc>>> {
    let raw: Option<String> = row
        .try_get(column)
        .map_err(|e| CoreError::storage(format!("Failed to get {column}: {e}")))?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map_err(|e| CoreError::storage(format!("Invalid {column}: {e}")))
            .map(|dt| dt.with_timezone(&Utc))
    })
    .transpose()
}

/// Checks if the error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        db_err.message().contains("UNIQUE constraint failed")
    } else {
        false
    }
}

/// Checks if the error is a foreign key constraint violation.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        db_err.message().contains("FOREIGN KEY constraint failed")
    } else {
        false
    }
}
