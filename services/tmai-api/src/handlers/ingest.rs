//! Knowledge ingestion handler.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tmai_core::{CoreError, ServiceId};

use crate::error::ApiError;
use crate::extract::require_session;
use crate::gateway::IngestionPipeline;
use crate::state::AppState;

/// Request to ingest owner-supplied text.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub service_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Response reporting what was chunked and persisted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub document_id: Uuid,
    pub chunks_inserted: usize,
    pub total_chunks: usize,
}

/// Ingest a document into an owned service.
pub async fn ingest_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let identity = require_session(&state, &headers).await?;
    let service_id = ServiceId::from_uuid(req.service_id);

    let service = state
        .services
        .get(service_id)
        .await?
        .ok_or_else(|| CoreError::not_found("service", service_id.to_string()))?;
    if service.tenant_id != identity.tenant_id {
        return Err(CoreError::forbidden("service belongs to another tenant").into());
    }

    let pipeline = IngestionPipeline::new(
        state.documents.clone(),
        state.embedder.clone(),
        state.settings.embedding_model.clone(),
        state.settings.embedding_dimension,
        state.settings.max_chunk_chars,
    );
    let report = pipeline.ingest(service_id, req.title, &req.text).await?;

    Ok(Json(IngestResponse {
        document_id: report.document_id.as_uuid(),
        chunks_inserted: report.chunks_inserted,
        total_chunks: report.total_chunks,
    }))
}
