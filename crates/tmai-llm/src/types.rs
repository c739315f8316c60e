use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for generation operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Model not found or not available.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Invalid input (empty prompt, over the context limit, etc.).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider unreachable, erroring, or timed out.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal error during generation.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for generation operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// One generation request: a fully assembled prompt plus sampling knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,
    /// Assembled prompt text.
    pub prompt: String,
    /// Sampling temperature, provider default when unset.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Completion length cap, provider default when unset.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Response from a generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model identifier that produced the completion.
    pub model: String,
    /// Completion text.
    pub text: String,
    /// Usage statistics.
    pub usage: TokenUsage,
}

/// Token usage for one generation call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: usize,
    /// Tokens produced in the completion.
    pub completion_tokens: usize,
}
