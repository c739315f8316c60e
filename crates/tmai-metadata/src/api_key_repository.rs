//! SQLite implementation of the API key repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, Row, SqlitePool};

use tmai_core::{
    ApiKeyDescriptor, ApiKeyId, ApiKeyRepository, CoreError, CoreResult, KeyLimits, ServiceId,
    TenantId,
};

use crate::util::{
    is_foreign_key_violation, is_unique_violation, parse_optional_timestamp, parse_timestamp,
};

/// SQLite implementation of [`ApiKeyRepository`].
pub struct SqliteApiKeyRepository {
    pool: SqlitePool,
}

impl SqliteApiKeyRepository {
    /// Creates a new SQLite API key repository.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyRepository for SqliteApiKeyRepository {
    async fn create(&self, descriptor: &ApiKeyDescriptor, key_hash: &str) -> CoreResult<()> {
        let key_id = descriptor.key_id.to_bytes().to_vec();
        let tenant_id = descriptor.tenant_id.to_bytes().to_vec();
        let service_id = descriptor.service_id.to_bytes().to_vec();
        let created_at = descriptor.created_at.to_rfc3339();
        let revoked_at = descriptor.revoked_at.map(|t| t.to_rfc3339());
        let last_used_at = descriptor.last_used_at.map(|t| t.to_rfc3339());

        query(
            "INSERT INTO api_keys (key_id, tenant_id, service_id, key_hash, name, key_prefix,
                                   last_four, rate_limit_per_minute, monthly_request_limit,
                                   created_at, revoked_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(key_id)
        .bind(tenant_id)
        .bind(service_id)
        .bind(key_hash)
        .bind(&descriptor.name)
        .bind(&descriptor.key_prefix)
        .bind(&descriptor.last_four)
        .bind(descriptor.limits.per_minute.map(i64::from))
        .bind(descriptor.limits.per_month.map(i64::from))
        .bind(created_at)
        .bind(revoked_at)
        .bind(last_used_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::already_exists("api_key", descriptor.key_prefix.as_str())
            } else if is_foreign_key_violation(&e) {
                CoreError::not_found("service", descriptor.service_id.to_string())
            } else {
                CoreError::storage(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn get(&self, key_id: ApiKeyId) -> CoreResult<Option<ApiKeyDescriptor>> {
        let row = query(
            "SELECT key_id, tenant_id, service_id, name, key_prefix, last_four,
                    rate_limit_per_minute, monthly_request_limit, created_at, revoked_at,
                    last_used_at
             FROM api_keys WHERE key_id = ?1",
        )
        .bind(key_id.to_bytes().to_vec())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::storage(e.to_string()))?;

        row.map(|r| parse_api_key_row(&r)).transpose()
    }

    async fn find_by_hash(&self, key_hash: &str) -> CoreResult<Option<ApiKeyDescriptor>> {
        let row = query(
            "SELECT key_id, tenant_id, service_id, name, key_prefix, last_four,
                    rate_limit_per_minute, monthly_request_limit, created_at, revoked_at,
                    last_used_at
             FROM api_keys WHERE key_hash = ?1",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::storage(e.to_string()))?;

        row.map(|r| parse_api_key_row(&r)).transpose()
    }

    async fn list_by_service(&self, service_id: ServiceId) -> CoreResult<Vec<ApiKeyDescriptor>> {
        let rows = query(
            "SELECT key_id, tenant_id, service_id, name, key_prefix, last_four,
                    rate_limit_per_minute, monthly_request_limit, created_at, revoked_at,
                    last_used_at
             FROM api_keys WHERE service_id = ?1 ORDER BY created_at DESC",
        )
        .bind(service_id.to_bytes().to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::storage(e.to_string()))?;

        rows.iter().map(parse_api_key_row).collect()
    }

    async fn revoke(&self, key_id: ApiKeyId, at: DateTime<Utc>) -> CoreResult<()> {
        // COALESCE keeps the original timestamp on repeat revocations.
        let result = query(
            "UPDATE api_keys SET revoked_at = COALESCE(revoked_at, ?1) WHERE key_id = ?2",
        )
        .bind(at.to_rfc3339())
        .bind(key_id.to_bytes().to_vec())
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("api_key", key_id.to_string()));
        }

        Ok(())
    }

    async fn delete(&self, key_id: ApiKeyId) -> CoreResult<()> {
        let key_id_bytes = key_id.to_bytes().to_vec();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::storage(e.to_string()))?;

        let row = query("SELECT revoked_at FROM api_keys WHERE key_id = ?1")
            .bind(key_id_bytes.clone())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| CoreError::storage(e.to_string()))?;

        let revoked_at: Option<String> = match row {
            Some(row) => row
                .try_get("revoked_at")
                .map_err(|e| CoreError::storage(e.to_string()))?,
            None => return Err(CoreError::not_found("api_key", key_id.to_string())),
        };

        if revoked_at.is_none() {
            return Err(CoreError::conflict(
                "API key must be revoked before it can be deleted",
            ));
        }

        // Usage counters cascade via the usage_windows foreign key.
        query("DELETE FROM api_keys WHERE key_id = ?1")
            .bind(key_id_bytes)
            .execute(&mut *tx)
            .await
            .map_err(|e| CoreError::storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| CoreError::storage(e.to_string()))?;

        Ok(())
    }

    async fn touch_last_used(&self, key_id: ApiKeyId, at: DateTime<Utc>) -> CoreResult<()> {
        query("UPDATE api_keys SET last_used_at = ?1 WHERE key_id = ?2")
            .bind(at.to_rfc3339())
            .bind(key_id.to_bytes().to_vec())
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::storage(e.to_string()))?;

        Ok(())
    }
}

/// Parses a SQLite row into an [`ApiKeyDescriptor`].
fn parse_api_key_row(row: &sqlx::sqlite::SqliteRow) -> CoreResult<ApiKeyDescriptor> {
    let key_id_bytes: Vec<u8> = row
        .try_get("key_id")
        .map_err(|e| CoreError::storage(format!("Failed to get key_id: {e}")))?;
    let key_id = ApiKeyId::from_bytes(&key_id_bytes)
        .map_err(|e| CoreError::storage(format!("Invalid key_id: {e}")))?;

    let tenant_id_bytes: Vec<u8> = row
        .try_get("tenant_id")
        .map_err(|e| CoreError::storage(format!("Failed to get tenant_id: {e}")))?;
    let tenant_id = TenantId::from_bytes(&tenant_id_bytes)
        .map_err(|e| CoreError::storage(format!("Invalid tenant_id: {e}")))?;

    let service_id_bytes: Vec<u8> = row
        .try_get("service_id")
        .map_err(|e| CoreError::storage(format!("Failed to get service_id: {e}")))?;
    let service_id = ServiceId::from_bytes(&service_id_bytes)
        .map_err(|e| CoreError::storage(format!("Invalid service_id: {e}")))?;

    let name: String = row
        .try_get("name")
        .map_err(|e| CoreError::storage(format!("Failed to get name: {e}")))?;
    let key_prefix: String = row
        .try_get("key_prefix")
        .map_err(|e| CoreError::storage(format!("Failed to get key_prefix: {e}")))?;
    let last_four: String = row
        .try_get("last_four")
        .map_err(|e| CoreError::storage(format!("Failed to get last_four: {e}")))?;

    let per_minute: Option<i64> = row
        .try_get("rate_limit_per_minute")
        .map_err(|e| CoreError::storage(format!("Failed to get rate_limit_per_minute: {e}")))?;
    let per_month: Option<i64> = row
        .try_get("monthly_request_limit")
        .map_err(|e| CoreError::storage(format!("Failed to get monthly_request_limit: {e}")))?;

    let created_at = parse_timestamp(row, "created_at")?;
    let revoked_at = parse_optional_timestamp(row, "revoked_at")?;
    let last_used_at = parse_optional_timestamp(row, "last_used_at")?;

    Ok(ApiKeyDescriptor {
        key_id,
        tenant_id,
        service_id,
        name,
        key_prefix,
        last_four,
        limits: KeyLimits {
            per_minute: per_minute.map(|v| v as u32),
            per_month: per_month.map(|v| v as u32),
        },
        created_at,
        revoked_at,
        last_used_at,
    })
}

