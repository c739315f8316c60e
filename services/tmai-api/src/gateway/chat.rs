//! Chat orchestration: scope resolution, quota, retrieval, prompt
//! assembly, and the generation call.
//!
//! Request lifecycle: `Unresolved -> ScopeResolved -> Quoted ->
//! Retrieved -> Assembled -> Answered`, failing out at any transition.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use tmai_core::{
    assemble, ChatTurn, CoreError, CoreResult, EffectiveConfig, ScopedKey, ServiceCatalog,
    ServiceDescriptor, ServiceId, SessionVerifier,
};
use tmai_embedding::{BatchEmbeddingRequest, EmbeddingProvider};
use tmai_llm::{ChatModel, GenerationRequest};

use crate::gateway::ingest::map_embedding_error;
use crate::gateway::{Authenticator, QuotaEnforcer, Retriever};
use crate::state::{AppState, RuntimeSettings};

/// Credentials and addressing presented with one chat request.
#[derive(Clone, Debug, Default)]
pub struct ChatRequestScope {
    /// Presented API key secret, if any.
    pub api_key: Option<String>,
    /// Presented session token, if any.
    pub session_token: Option<String>,
    /// Service explicitly named in the request body, if any.
    pub service_id: Option<ServiceId>,
}

/// Composes authenticator, quota enforcer, retriever, prompt assembler,
/// and the generation call. The only component that talks to all the
/// others.
pub struct ChatOrchestrator {
    authenticator: Authenticator,
    quota: QuotaEnforcer,
    retriever: Retriever,
    services: Arc<dyn ServiceCatalog>,
    sessions: Arc<dyn SessionVerifier>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn ChatModel>,
    settings: Arc<RuntimeSettings>,
}

impl ChatOrchestrator {
    /// Wires an orchestrator from shared application state.
    #[must_use]
    pub fn from_state(state: &AppState) -> Self {
        Self {
            authenticator: Authenticator::new(state.api_keys.clone()),
            quota: QuotaEnforcer::new(state.counters.clone(), state.api_keys.clone()),
            retriever: Retriever::new(
                state.documents.clone(),
                state.settings.top_k,
                state.settings.candidate_pool,
            ),
            services: state.services.clone(),
            sessions: state.sessions.clone(),
            embedder: state.embedder.clone(),
            generator: state.generator.clone(),
            settings: state.settings.clone(),
        }
    }

    /// Runs one chat request to completion.
    pub async fn chat(
        &self,
        scope: ChatRequestScope,
        history: &[ChatTurn],
        user_message: &str,
    ) -> CoreResult<String> {
        if user_message.trim().is_empty() {
            return Err(CoreError::invalid_input("message must not be empty"));
        }

        // Scope resolution: the API-key path and the session path are
        // mutually exclusive; a presented key always takes the key path.
        let (service_id, quota_scope) = self.resolve_scope(&scope).await?;

        // Quota applies to the API-key path only, and is consumed before
        // the upstream call per the accepted-requests metering policy.
        if let Some(key) = &quota_scope {
            self.quota.enforce(key, Utc::now()).await?;
        }

        let service = self
            .services
            .get(service_id)
            .await?
            .ok_or_else(|| CoreError::not_found("service", service_id.to_string()))?;

        let retrieved = {
            let query = self.embed_query(user_message).await?;
            self.retriever.retrieve(service_id, &query).await?
        };
        debug!(
            service_id = %service_id,
            retrieved = retrieved.len(),
            "retrieval complete"
        );

        let prompt = self.render_prompt(&service, &retrieved, history, user_message);

        let response = self
            .generator
            .generate(GenerationRequest {
                model: self.settings.generation_model.clone(),
                prompt,
                temperature: None,
                max_tokens: None,
            })
            .await
            .map_err(|err| CoreError::upstream(err.to_string()))?;

        info!(service_id = %service_id, grounded = !retrieved.is_empty(), "answered chat");
        Ok(response.text)
    }

    /// Resolves the request to a service scope via exactly one of the two
    /// paths: presented API key, or verified session plus explicit
    /// service id.
    async fn resolve_scope(
        &self,
        scope: &ChatRequestScope,
    ) -> CoreResult<(ServiceId, Option<ScopedKey>)> {
        if let Some(secret) = &scope.api_key {
            let key = self.authenticator.authenticate(secret).await?;
            if let Some(requested) = scope.service_id {
                // A mismatch is a scope violation, never silently
                // corrected to the key's own service.
                if requested != key.service_id {
                    return Err(CoreError::forbidden(
                        "API key is not scoped to the requested service",
                    ));
                }
            }
            return Ok((key.service_id, Some(key)));
        }

        if let Some(token) = &scope.session_token {
            let identity = self
                .sessions
                .verify(token)
                .await?
                .ok_or_else(|| CoreError::unauthenticated("invalid or expired session"))?;
            let service_id = scope
                .service_id
                .ok_or_else(|| CoreError::invalid_input("serviceId is required for session chat"))?;
            let service = self
                .services
                .get(service_id)
                .await?
                .ok_or_else(|| CoreError::not_found("service", service_id.to_string()))?;
            if service.tenant_id != identity.tenant_id {
                return Err(CoreError::forbidden("service belongs to another tenant"));
            }
            return Ok((service_id, None));
        }

        Err(CoreError::unauthenticated(
            "present an API key or a session token",
        ))
    }

    async fn embed_query(&self, user_message: &str) -> CoreResult<Vec<f32>> {
        let mut response = self
            .embedder
            .embed_batch(BatchEmbeddingRequest {
                model: self.settings.embedding_model.clone(),
                inputs: vec![user_message.to_string()],
                normalize: false,
            })
            .await
            .map_err(map_embedding_error)?;

        if response.embeddings.len() != 1 {
            return Err(CoreError::embedding_mismatch(format!(
                "expected 1 query vector, got {}",
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings.remove(0))
    }

    fn render_prompt(
        &self,
        service: &ServiceDescriptor,
        retrieved: &[tmai_core::RetrievedChunk],
        history: &[ChatTurn],
        user_message: &str,
    ) -> String {
        // Precedence is resolved once per request so the effective config
        // stays internally consistent.
        let effective = EffectiveConfig::resolve(
            &self.settings.platform_prompt,
            service.system_prompt.as_deref(),
            service.prompt_config.as_ref(),
        );
        assemble(&effective, retrieved, history, user_message)
    }
}
