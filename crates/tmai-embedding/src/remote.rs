//! OpenAI-compatible HTTP embedding adapter.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::provider::EmbeddingProvider;
use crate::types::{
    BatchEmbeddingRequest, BatchEmbeddingResponse, EmbeddingError, EmbeddingResult, ModelInfo,
    Usage,
};

/// Configuration for the remote embedding adapter.
#[derive(Clone, Debug)]
pub struct RemoteEmbeddingConfig {
    /// Base URL of the provider, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token, if the provider requires one.
    pub api_key: Option<String>,
    /// Model identifier sent with each request.
    pub model: String,
    /// Fixed output dimension the provider is expected to return.
    pub dimension: u32,
    /// Upper bound on each HTTP call.
    pub timeout: Duration,
}

/// Embedding provider backed by an OpenAI-compatible `/embeddings`
/// endpoint.
///
/// The response shape is validated here, at the adapter edge: vector
/// count must equal the input count and every vector must carry the
/// configured dimension. Callers downstream consume a typed contract.
pub struct RemoteEmbeddingProvider {
    http: reqwest::Client,
    config: RemoteEmbeddingConfig,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct WireResponse {
    data: Vec<WireEmbedding>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    total_tokens: usize,
}

impl RemoteEmbeddingProvider {
    /// Creates a new remote provider.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(config: RemoteEmbeddingConfig) -> EmbeddingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::Internal(format!("HTTP client build failed: {e}")))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingProvider {
    async fn embed_batch(
        &self,
        request: BatchEmbeddingRequest,
    ) -> EmbeddingResult<BatchEmbeddingResponse> {
        if request.inputs.is_empty() {
            return Err(EmbeddingError::InvalidInput("empty input batch".to_string()));
        }

        let start = Instant::now();
        let mut http_request = self.http.post(self.endpoint()).json(&WireRequest {
            model: &self.config.model,
            input: &request.inputs,
        });
        if let Some(api_key) = &self.config.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::ServiceUnavailable("embedding call timed out".to_string())
            } else {
                EmbeddingError::ServiceUnavailable(format!("embedding call failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::ServiceUnavailable(format!(
                "embedding provider returned HTTP {status}"
            )));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::ContractViolation(format!("unparsable response: {e}")))?;

        if wire.data.len() != request.inputs.len() {
            return Err(EmbeddingError::ContractViolation(format!(
                "expected {} vectors, got {}",
                request.inputs.len(),
                wire.data.len()
            )));
        }

        // Providers may return rows out of order; the index field is
        // authoritative.
        let mut data = wire.data;
        data.sort_by_key(|row| row.index);

        let expected = self.config.dimension as usize;
        for row in &data {
            if row.embedding.len() != expected {
                return Err(EmbeddingError::ContractViolation(format!(
                    "expected dimension {expected}, got {} at index {}",
                    row.embedding.len(),
                    row.index
                )));
            }
        }

        let total_tokens = wire.usage.map(|u| u.total_tokens).unwrap_or_default();
        debug!(
            inputs = request.inputs.len(),
            total_tokens,
            latency_ms = start.elapsed().as_millis() as u64,
            "embedded batch"
        );

        Ok(BatchEmbeddingResponse {
            model: self.config.model.clone(),
            embeddings: data.into_iter().map(|row| row.embedding).collect(),
            usage: Usage {
                total_tokens,
                duration_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    async fn model_info(&self) -> EmbeddingResult<ModelInfo> {
        Ok(ModelInfo {
            model: self.config.model.clone(),
            dimension: self.config.dimension,
            max_tokens: 8192,
        })
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        // One tiny embedding round trip doubles as the health probe.
        self.embed_batch(BatchEmbeddingRequest {
            model: self.config.model.clone(),
            inputs: vec!["ping".to_string()],
            normalize: false,
        })
        .await
        .map(|_| ())
    }
}
