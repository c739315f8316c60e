//! Chat handler: accepts both the current and the legacy request shape.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tmai_core::{ChatRole, ChatTurn, CoreError, ServiceId};

use crate::error::ApiError;
use crate::extract::{extract_api_key, extract_session_token};
use crate::gateway::{ChatOrchestrator, ChatRequestScope};
use crate::state::AppState;

/// One message in a chat request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageBody {
    pub role: ChatRole,
    pub content: String,
}

/// Chat request body: the current `messages` shape, or the legacy
/// single-`message` shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChatRequestBody {
    #[serde(rename_all = "camelCase")]
    Current {
        #[serde(default)]
        service_id: Option<Uuid>,
        messages: Vec<ChatMessageBody>,
    },
    #[serde(rename_all = "camelCase")]
    Legacy {
        message: String,
        service_id: Uuid,
        #[serde(default)]
        history: Option<Vec<ChatMessageBody>>,
    },
}

/// Chat response body.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Answer one chat request.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatResponse>, ApiError> {
    let (service_id, history, user_message) = normalize_body(body)?;

    let scope = ChatRequestScope {
        api_key: extract_api_key(&headers),
        session_token: extract_session_token(&headers),
        service_id: service_id.map(ServiceId::from_uuid),
    };

    let orchestrator = ChatOrchestrator::from_state(&state);
    let response = orchestrator.chat(scope, &history, &user_message).await?;

    Ok(Json(ChatResponse { response }))
}

/// Normalizes either body shape into (service, history, user message).
///
/// In the current shape the trailing message must be the user's; turns
/// before it become history.
fn normalize_body(
    body: ChatRequestBody,
) -> Result<(Option<Uuid>, Vec<ChatTurn>, String), ApiError> {
    match body {
        ChatRequestBody::Current {
            service_id,
            mut messages,
        } => {
            let last = messages
                .pop()
                .ok_or_else(|| CoreError::invalid_input("messages must not be empty"))?;
            if last.role != ChatRole::User {
                return Err(
                    CoreError::invalid_input("the final message must have role `user`").into(),
                );
            }
            let history = messages
                .into_iter()
                .map(|m| ChatTurn::new(m.role, m.content))
                .collect();
            Ok((service_id, history, last.content))
        }
        ChatRequestBody::Legacy {
            message,
            service_id,
            history,
        } => {
            let history = history
                .unwrap_or_default()
                .into_iter()
                .map(|m| ChatTurn::new(m.role, m.content))
                .collect();
            Ok((Some(service_id), history, message))
        }
    }
}
