//! API key management handlers.
//!
//! All key management requires a first-party session owning the target
//! service; API keys cannot mint or revoke other keys.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tmai_core::{
    ApiKeyDescriptor, ApiKeyId, CoreError, ServiceId, SessionIdentity,
};

use crate::error::ApiError;
use crate::extract::require_session;
use crate::gateway::KeyIssuer;
use crate::state::AppState;

/// Request to issue a new key.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueKeyRequest {
    pub service_id: Uuid,
    pub name: String,
}

/// Response to a successful issuance. Carries the plaintext secret,
/// observable exactly once.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueKeyResponse {
    pub secret: String,
    pub id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub prefix: String,
    pub last4: String,
    pub rate_limit_per_minute: Option<u32>,
    pub monthly_request_limit: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Key descriptor as listed; never includes a secret or its hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyView {
    pub id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub prefix: String,
    pub last4: String,
    pub rate_limit_per_minute: Option<u32>,
    pub monthly_request_limit: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<ApiKeyDescriptor> for KeyView {
    fn from(descriptor: ApiKeyDescriptor) -> Self {
        Self {
            id: descriptor.key_id.as_uuid(),
            service_id: descriptor.service_id.as_uuid(),
            name: descriptor.name,
            prefix: descriptor.key_prefix,
            last4: descriptor.last_four,
            rate_limit_per_minute: descriptor.limits.per_minute,
            monthly_request_limit: descriptor.limits.per_month,
            created_at: descriptor.created_at,
            revoked_at: descriptor.revoked_at,
            last_used_at: descriptor.last_used_at,
        }
    }
}

/// Query parameters for listing keys.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListKeysQuery {
    pub service_id: Uuid,
}

/// Response when listing keys.
#[derive(Debug, Serialize)]
pub struct ListKeysResponse {
    pub keys: Vec<KeyView>,
    pub total: usize,
}

/// Response to a revocation.
#[derive(Debug, Serialize)]
pub struct RevokeKeyResponse {
    pub id: Uuid,
    pub revoked: bool,
}

/// Issue a new API key for an owned service.
pub async fn issue_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IssueKeyRequest>,
) -> Result<Json<IssueKeyResponse>, ApiError> {
    let identity = require_session(&state, &headers).await?;
    let service_id = ServiceId::from_uuid(req.service_id);
    require_owned_service(&state, &identity, service_id).await?;

    let issuer = KeyIssuer::new(state.api_keys.clone(), state.settings.default_limits);
    let issued = issuer
        .issue(identity.tenant_id, service_id, &req.name)
        .await?;

    Ok(Json(IssueKeyResponse {
        secret: issued.secret,
        id: issued.descriptor.key_id.as_uuid(),
        service_id: issued.descriptor.service_id.as_uuid(),
        name: issued.descriptor.name,
        prefix: issued.descriptor.key_prefix,
        last4: issued.descriptor.last_four,
        rate_limit_per_minute: issued.descriptor.limits.per_minute,
        monthly_request_limit: issued.descriptor.limits.per_month,
        created_at: issued.descriptor.created_at,
    }))
}

/// List keys for an owned service. Secrets are unrecoverable; only
/// display fields are returned.
pub async fn list_keys(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListKeysQuery>,
) -> Result<Json<ListKeysResponse>, ApiError> {
    let identity = require_session(&state, &headers).await?;
    let service_id = ServiceId::from_uuid(query.service_id);
    require_owned_service(&state, &identity, service_id).await?;

    let keys: Vec<KeyView> = state
        .api_keys
        .list_by_service(service_id)
        .await?
        .into_iter()
        .map(KeyView::from)
        .collect();

    Ok(Json(ListKeysResponse {
        total: keys.len(),
        keys,
    }))
}

/// Revoke a key. Idempotent: revoking an already-revoked key succeeds.
pub async fn revoke_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key_id): Path<Uuid>,
) -> Result<Json<RevokeKeyResponse>, ApiError> {
    let identity = require_session(&state, &headers).await?;
    let key_id = ApiKeyId::from_uuid(key_id);
    require_owned_key(&state, &identity, key_id).await?;

    state.api_keys.revoke(key_id, Utc::now()).await?;
    info!(key_id = %key_id, "revoked API key");

    Ok(Json(RevokeKeyResponse {
        id: key_id.as_uuid(),
        revoked: true,
    }))
}

/// Hard-delete a key. Only permitted once revoked; usage counters
/// cascade with it.
pub async fn delete_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let identity = require_session(&state, &headers).await?;
    let key_id = ApiKeyId::from_uuid(key_id);
    require_owned_key(&state, &identity, key_id).await?;

    state.api_keys.delete(key_id).await?;
    info!(key_id = %key_id, "deleted API key");

    Ok(StatusCode::NO_CONTENT)
}

/// Fails unless the service exists and belongs to the session tenant.
async fn require_owned_service(
    state: &AppState,
    identity: &SessionIdentity,
    service_id: ServiceId,
) -> Result<(), ApiError> {
    let service = state
        .services
        .get(service_id)
        .await?
        .ok_or_else(|| CoreError::not_found("service", service_id.to_string()))?;
    if service.tenant_id != identity.tenant_id {
        return Err(CoreError::forbidden("service belongs to another tenant").into());
    }
    Ok(())
}

/// Fails unless the key exists and belongs to the session tenant.
async fn require_owned_key(
    state: &AppState,
    identity: &SessionIdentity,
    key_id: ApiKeyId,
) -> Result<(), ApiError> {
    let key = state
        .api_keys
        .get(key_id)
        .await?
        .ok_or_else(|| CoreError::not_found("api_key", key_id.to_string()))?;
    if key.tenant_id != identity.tenant_id {
        return Err(CoreError::forbidden("API key belongs to another tenant").into());
    }
    Ok(())
}
