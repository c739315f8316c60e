//! SQLite implementation of the fixed-window usage counter store.
//!
//! The conditional increment is a single `INSERT .. ON CONFLICT .. DO
//! UPDATE .. WHERE` statement, so concurrent requests against the same
//! (key, kind, window) tuple are linearized by SQLite: only increments
//! that observe a count strictly under the limit are applied, and
//! `rows_affected` tells us whether ours was.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_scalar, SqlitePool};

use tmai_core::{ApiKeyId, CoreError, CoreResult, UsageCounterStore, WindowKind};

/// SQLite implementation of [`UsageCounterStore`].
pub struct SqliteUsageCounterStore {
    pool: SqlitePool,
}

impl SqliteUsageCounterStore {
    /// Creates a new SQLite usage counter store.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageCounterStore for SqliteUsageCounterStore {
    async fn try_consume(
        &self,
        key_id: ApiKeyId,
        kind: WindowKind,
        window_start: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        limit: u32,
    ) -> CoreResult<bool> {
        // A zero limit admits nothing; the insert arm below could not
        // express that, so it never reaches the store.
        if limit == 0 {
            return Ok(false);
        }

        let result = query(
            "INSERT INTO usage_windows (key_id, kind, window_start, count, expires_at)
             VALUES (?1, ?2, ?3, 1, ?4)
             ON CONFLICT (key_id, kind, window_start)
             DO UPDATE SET count = count + 1
             WHERE usage_windows.count < ?5",
        )
        .bind(key_id.to_bytes().to_vec())
        .bind(kind.as_str())
        .bind(window_start.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .bind(i64::from(limit))
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::storage(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn window_count(
        &self,
        key_id: ApiKeyId,
        kind: WindowKind,
        window_start: DateTime<Utc>,
    ) -> CoreResult<u32> {
        let count: Option<i64> = query_scalar(
            "SELECT count FROM usage_windows
             WHERE key_id = ?1 AND kind = ?2 AND window_start = ?3",
        )
        .bind(key_id.to_bytes().to_vec())
        .bind(kind.as_str())
        .bind(window_start.to_rfc3339())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::storage(e.to_string()))?;

        Ok(count.unwrap_or(0) as u32)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> CoreResult<u64> {
        let result = query("DELETE FROM usage_windows WHERE expires_at <= ?1")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::storage(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
