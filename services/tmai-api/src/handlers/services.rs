//! Service management handlers.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tmai_core::{PromptConfig, ServiceDescriptor};

use crate::error::ApiError;
use crate::extract::require_session;
use crate::state::AppState;
use crate::validation::{slugify, validate_service_name, validate_slug};

/// Request to create a new chat service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    pub name: String,
    /// Explicit slug; derived from the name when absent.
    #[serde(default)]
    pub slug: Option<String>,
    /// Legacy single-string system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Structured prompt override.
    #[serde(default)]
    pub prompt_config: Option<PromptConfig>,
}

/// Response for service operations.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Create a new service owned by the session tenant.
pub async fn create_service(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateServiceRequest>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let identity = require_session(&state, &headers).await?;

    validate_service_name(&req.name)?;
    let slug = match req.slug {
        Some(slug) => {
            validate_slug(&slug)?;
            slug
        }
        None => {
            let derived = slugify(&req.name);
            validate_slug(&derived)?;
            derived
        }
    };

    let mut service = ServiceDescriptor::new(identity.tenant_id, req.name.trim(), slug);
    if let Some(prompt) = req.system_prompt {
        service = service.with_system_prompt(prompt);
    }
    if let Some(config) = req.prompt_config {
        service = service.with_prompt_config(config);
    }

    state.services.create(&service).await?;
    info!(service_id = %service.service_id, slug = %service.slug, "created service");

    Ok(Json(ServiceResponse {
        id: service.service_id.as_uuid(),
        name: service.name,
        slug: service.slug,
        created_at: service.created_at,
    }))
}
