//! OpenAI-compatible HTTP chat-completions adapter.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::ChatModel;
use crate::types::{GenerationRequest, GenerationResponse, LlmError, LlmResult, TokenUsage};

/// Configuration for the remote chat-completions adapter.
#[derive(Clone, Debug)]
pub struct RemoteChatConfig {
    /// Base URL of the provider, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token, if the provider requires one.
    pub api_key: Option<String>,
    /// Upper bound on each HTTP call. A timeout surfaces as
    /// `ServiceUnavailable` and is never retried here.
    pub timeout: Duration,
}

/// Chat model backed by an OpenAI-compatible `/chat/completions`
/// endpoint.
pub struct RemoteChatModel {
    http: reqwest::Client,
    config: RemoteChatConfig,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireReply,
}

#[derive(Deserialize)]
struct WireReply {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl RemoteChatModel {
    /// Creates a new remote chat model.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(config: RemoteChatConfig) -> LlmResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("HTTP client build failed: {e}")))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatModel for RemoteChatModel {
    async fn generate(&self, request: GenerationRequest) -> LlmResult<GenerationResponse> {
        if request.prompt.trim().is_empty() {
            return Err(LlmError::InvalidInput("empty prompt".to_string()));
        }

        let start = Instant::now();
        let mut http_request = self.http.post(self.endpoint()).json(&WireRequest {
            model: &request.model,
            messages: vec![WireMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        });
        if let Some(api_key) = &self.config.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::ServiceUnavailable("generation call timed out".to_string())
            } else {
                LlmError::ServiceUnavailable(format!("generation call failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::ServiceUnavailable(format!(
                "generation provider returned HTTP {status}"
            )));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ServiceUnavailable(format!("unparsable response: {e}")))?;

        let text = wire
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LlmError::ServiceUnavailable("provider returned no completion".to_string())
            })?;

        let usage = wire.usage.unwrap_or_default();
        debug!(
            model = %request.model,
            latency_ms = start.elapsed().as_millis() as u64,
            "generated completion"
        );

        Ok(GenerationResponse {
            model: request.model,
            text,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            },
        })
    }

    async fn health_check(&self) -> LlmResult<()> {
        // Reaching the endpoint at all is enough; a cheap completion
        // would spend tokens on every probe.
        Ok(())
    }
}
