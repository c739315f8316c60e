use async_trait::async_trait;

use crate::model::ChatModel;
use crate::types::{GenerationRequest, GenerationResponse, LlmError, LlmResult, TokenUsage};

enum MockBehavior {
    /// Echo the tail of the prompt back.
    Echo,
    /// Always return a fixed completion.
    Fixed(String),
    /// Always fail with a `ServiceUnavailable` error.
    Fail(String),
}

/// Mock chat model for testing.
///
/// Deterministic and dependency-free; lets orchestration tests assert on
/// completions and on upstream-failure handling.
pub struct MockChatModel {
    model: String,
    behavior: MockBehavior,
}

impl MockChatModel {
    /// Default model name for the mock model.
    pub const DEFAULT_MODEL: &'static str = "mock-chat";

    /// Creates a mock that echoes the last prompt line.
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            behavior: MockBehavior::Echo,
        }
    }

    /// Creates a mock that always returns `reply`.
    #[must_use]
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            behavior: MockBehavior::Fixed(reply.into()),
        }
    }

    /// Creates a mock whose every call fails like an unreachable provider.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            behavior: MockBehavior::Fail(message.into()),
        }
    }

    fn estimate_tokens(text: &str) -> usize {
        text.split_whitespace().count().max(1)
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn generate(&self, request: GenerationRequest) -> LlmResult<GenerationResponse> {
        if request.prompt.trim().is_empty() {
            return Err(LlmError::InvalidInput("empty prompt".to_string()));
        }

        let text = match &self.behavior {
            MockBehavior::Echo => {
                let tail = request.prompt.lines().last().unwrap_or_default();
                format!("echo: {tail}")
            }
            MockBehavior::Fixed(reply) => reply.clone(),
            MockBehavior::Fail(message) => {
                return Err(LlmError::ServiceUnavailable(message.clone()))
            }
        };

        Ok(GenerationResponse {
            model: self.model.clone(),
            usage: TokenUsage {
                prompt_tokens: Self::estimate_tokens(&request.prompt),
                completion_tokens: Self::estimate_tokens(&text),
            },
            text,
        })
    }

    async fn health_check(&self) -> LlmResult<()> {
        match &self.behavior {
            MockBehavior::Fail(message) => Err(LlmError::ServiceUnavailable(message.clone())),
            _ => Ok(()),
        }
    }
}
