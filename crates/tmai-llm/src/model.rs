use async_trait::async_trait;

use crate::types::{GenerationRequest, GenerationResponse, LlmResult};

/// Trait for chat generation model providers.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce one completion for an assembled prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The model is not found
    /// - The prompt is rejected by input validation
    /// - The provider is unreachable or the bounded timeout elapses
    async fn generate(&self, request: GenerationRequest) -> LlmResult<GenerationResponse>;

    /// Health check for the generation service.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unhealthy.
    async fn health_check(&self) -> LlmResult<()>;
}
