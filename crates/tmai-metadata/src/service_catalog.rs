//! SQLite implementation of the service catalog.

use async_trait::async_trait;
use sqlx::{query, Row, SqlitePool};

use tmai_core::{
    CoreError, CoreResult, PromptConfig, ServiceCatalog, ServiceDescriptor, ServiceId, TenantId,
};

use crate::util::{is_unique_violation, parse_timestamp};

/// SQLite implementation of [`ServiceCatalog`].
pub struct SqliteServiceCatalog {
    pool: SqlitePool,
}

impl SqliteServiceCatalog {
    /// Creates a new SQLite service catalog.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceCatalog for SqliteServiceCatalog {
    async fn create(&self, service: &ServiceDescriptor) -> CoreResult<()> {
        let prompt_config = service
            .prompt_config
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        query(
            "INSERT INTO services (service_id, tenant_id, name, slug, system_prompt,
                                   prompt_config, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(service.service_id.to_bytes().to_vec())
        .bind(service.tenant_id.to_bytes().to_vec())
        .bind(&service.name)
        .bind(&service.slug)
        .bind(&service.system_prompt)
        .bind(prompt_config)
        .bind(service.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::already_exists("service", service.slug.as_str())
            } else {
                CoreError::storage(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn get(&self, service_id: ServiceId) -> CoreResult<Option<ServiceDescriptor>> {
        let row = query(
            "SELECT service_id, tenant_id, name, slug, system_prompt, prompt_config, created_at
             FROM services WHERE service_id = ?1",
        )
        .bind(service_id.to_bytes().to_vec())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::storage(e.to_string()))?;

        row.map(|r| parse_service_row(&r)).transpose()
    }

    async fn list_by_tenant(&self, tenant_id: TenantId) -> CoreResult<Vec<ServiceDescriptor>> {
        let rows = query(
            "SELECT service_id, tenant_id, name, slug, system_prompt, prompt_config, created_at
             FROM services WHERE tenant_id = ?1 ORDER BY created_at ASC",
        )
        .bind(tenant_id.to_bytes().to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::storage(e.to_string()))?;

        rows.iter().map(parse_service_row).collect()
    }
}

/// Parses a SQLite row into a [`ServiceDescriptor`].
fn parse_service_row(row: &sqlx::sqlite::SqliteRow) -> CoreResult<ServiceDescriptor> {
    let service_id_bytes: Vec<u8> = row
        .try_get("service_id")
        .map_err(|e| CoreError::storage(format!("Failed to get service_id: {e}")))?;
    let service_id = ServiceId::from_bytes(&service_id_bytes)
        .map_err(|e| CoreError::storage(format!("Invalid service_id: {e}")))?;

    let tenant_id_bytes: Vec<u8> = row
        .try_get("tenant_id")
        .map_err(|e| CoreError::storage(format!("Failed to get tenant_id: {e}")))?;
    let tenant_id = TenantId::from_bytes(&tenant_id_bytes)
        .map_err(|e| CoreError::storage(format!("Invalid tenant_id: {e}")))?;

    let name: String = row
        .try_get("name")
        .map_err(|e| CoreError::storage(format!("Failed to get name: {e}")))?;
    let slug: String = row
        .try_get("slug")
        .map_err(|e| CoreError::storage(format!("Failed to get slug: {e}")))?;
    let system_prompt: Option<String> = row
        .try_get("system_prompt")
        .map_err(|e| CoreError::storage(format!("Failed to get system_prompt: {e}")))?;

    let prompt_config_json: Option<String> = row
        .try_get("prompt_config")
        .map_err(|e| CoreError::storage(format!("Failed to get prompt_config: {e}")))?;
    let prompt_config: Option<PromptConfig> = prompt_config_json
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| CoreError::storage(format!("Failed to parse prompt_config: {e}")))?;

    let created_at = parse_timestamp(row, "created_at")?;

    Ok(ServiceDescriptor {
        service_id,
        tenant_id,
        name,
        slug,
        system_prompt,
        prompt_config,
        created_at,
    })
}
