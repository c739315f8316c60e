//! Axum router for the TMAI gateway.

use axum::extract::Request;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;
use tracing::{info_span, Span};
use uuid::Uuid;

use crate::handlers::{
    chat, create_service, delete_key, health_check, ingest_document, issue_key, list_keys,
    revoke_key,
};
use crate::state::AppState;

/// Builds the Axum router hosting the gateway.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Liveness (no credentials required)
        .route("/health", get(health_check))
        // Service management (session)
        .route("/services", post(create_service))
        // Key management (session, ownership enforced per handler)
        .route("/keys", post(issue_key).get(list_keys))
        .route("/keys/:id/revoke", post(revoke_key))
        .route("/keys/:id", axum::routing::delete(delete_key))
        // Knowledge ingestion (session)
        .route("/ingest", post(ingest_document))
        // Chat (API key or session)
        .route("/chat", post(chat))
        .with_state(state)
        // Logging layer
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let request_id = Uuid::new_v4();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(|_request: &Request, _span: &Span| {
                    tracing::debug!("started processing request");
                })
                .on_response(
                    |response: &Response, latency: std::time::Duration, _span: &Span| {
                        let status = response.status();
                        let latency_ms = latency.as_millis();

                        if status.is_server_error() {
                            tracing::error!(status = %status, latency_ms, "request failed with server error");
                        } else if status.is_client_error() {
                            tracing::warn!(status = %status, latency_ms, "request failed with client error");
                        } else {
                            tracing::info!(status = %status, latency_ms, "request completed");
                        }
                    },
                )
                .on_failure(
                    |failure_class: ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &Span| {
                        tracing::error!(
                            failure_class = ?failure_class,
                            latency_ms = latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        )
}
