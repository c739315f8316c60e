//! Shared application state for the API server.

use std::sync::Arc;

use tmai_core::{
    ApiKeyRepository, DocumentRepository, KeyLimits, PromptConfig, ServiceCatalog, SessionVerifier,
    UsageCounterStore,
};
use tmai_embedding::EmbeddingProvider;
use tmai_llm::ChatModel;

use crate::config::TmaiConfig;

/// Runtime settings derived from configuration once at startup.
#[derive(Clone, Debug)]
pub struct RuntimeSettings {
    /// Server-controlled limits stamped on newly issued keys.
    pub default_limits: KeyLimits,
    /// Maximum characters per ingestion chunk.
    pub max_chunk_chars: usize,
    /// Ranked chunks returned per retrieval.
    pub top_k: usize,
    /// Candidates considered before truncating to `top_k`.
    pub candidate_pool: usize,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Fixed embedding dimension.
    pub embedding_dimension: u32,
    /// Generation model identifier.
    pub generation_model: String,
    /// Platform-default prompt configuration, passed explicitly into the
    /// assembler on every request.
    pub platform_prompt: PromptConfig,
}

impl RuntimeSettings {
    /// Derives runtime settings from loaded configuration.
    #[must_use]
    pub fn from_config(config: &TmaiConfig) -> Self {
        Self {
            default_limits: config.keys.limits(),
            max_chunk_chars: config.ingest.max_chunk_chars,
            top_k: config.retrieval.top_k,
            candidate_pool: config.retrieval.candidate_pool,
            embedding_model: config.embedding.model.clone(),
            embedding_dimension: config.embedding.dimension,
            generation_model: config.generation.model.clone(),
            platform_prompt: default_platform_prompt(),
        }
    }
}

/// The platform-default prompt configuration.
///
/// An explicit value handed to the assembler per request, not a hidden
/// module singleton, so merge behavior stays testable with injected
/// defaults.
#[must_use]
pub fn default_platform_prompt() -> PromptConfig {
    PromptConfig {
        role: Some("You are a helpful assistant for this service.".into()),
        instruction: Some(
            "Answer using the provided context when it is relevant. \
             When the context does not cover the question, say so plainly."
                .into(),
        ),
        ..PromptConfig::default()
    }
}

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
    /// Service catalog.
    pub services: Arc<dyn ServiceCatalog>,
    /// API key records.
    pub api_keys: Arc<dyn ApiKeyRepository>,
    /// Fixed-window usage counters.
    pub counters: Arc<dyn UsageCounterStore>,
    /// Knowledge documents and chunks.
    pub documents: Arc<dyn DocumentRepository>,
    /// Embedding collaborator.
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Generation collaborator.
    pub generator: Arc<dyn ChatModel>,
    /// Session auth collaborator.
    pub sessions: Arc<dyn SessionVerifier>,
    /// Derived runtime settings.
    pub settings: Arc<RuntimeSettings>,
}
