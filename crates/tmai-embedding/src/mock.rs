use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use async_trait::async_trait;

use crate::provider::EmbeddingProvider;
use crate::types::{
    BatchEmbeddingRequest, BatchEmbeddingResponse, EmbeddingError, EmbeddingResult, ModelInfo,
    Usage,
};

/// Mock embedding provider for testing.
///
/// Generates deterministic embeddings based on input hash, allowing
/// integration tests to run without a live provider. Similar inputs do
/// not embed near each other; only exact-equality retrieval behavior is
/// deterministic.
pub struct MockEmbeddingProvider {
    model: String,
    dimension: u32,
}

impl MockEmbeddingProvider {
    /// Default model name for the mock provider.
    pub const DEFAULT_MODEL: &'static str = "mock-embed-64";
    /// Default dimension (64).
    pub const DEFAULT_DIMENSION: u32 = 64;

    /// Creates a new mock provider with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            dimension: Self::DEFAULT_DIMENSION,
        }
    }

    /// Creates a mock provider with custom dimension.
    #[must_use]
    pub fn with_dimension(dimension: u32) -> Self {
        Self {
            model: format!("mock-embed-{dimension}"),
            dimension,
        }
    }

    /// Generate a deterministic embedding for a given text input.
    ///
    /// Uses the hash of the input string to seed a deterministic vector.
    /// The vector is L2 normalized if requested.
    fn generate_embedding(&self, text: &str, normalize: bool) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension as usize);
        let mut state = seed;

        for _ in 0..self.dimension {
            // Simple LCG (Linear Congruential Generator) for deterministic values
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let value = ((state >> 16) as f32) / 32768.0 - 1.0; // Range: [-1, 1]
            embedding.push(value);
        }

        if normalize {
            let magnitude = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if magnitude > 0.0 {
                for value in &mut embedding {
                    *value /= magnitude;
                }
            }
        }

        embedding
    }

    /// Estimate token count (simple word count for mock).
    fn estimate_tokens(text: &str) -> usize {
        text.split_whitespace().count().max(1)
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(
        &self,
        request: BatchEmbeddingRequest,
    ) -> EmbeddingResult<BatchEmbeddingResponse> {
        let start = Instant::now();

        if request.inputs.is_empty() {
            return Err(EmbeddingError::InvalidInput("empty input batch".to_string()));
        }

        let embeddings: Vec<Vec<f32>> = request
            .inputs
            .iter()
            .map(|text| self.generate_embedding(text, request.normalize))
            .collect();

        let total_tokens = request
            .inputs
            .iter()
            .map(|text| Self::estimate_tokens(text))
            .sum();

        Ok(BatchEmbeddingResponse {
            model: self.model.clone(),
            embeddings,
            usage: Usage {
                total_tokens,
                duration_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    async fn model_info(&self) -> EmbeddingResult<ModelInfo> {
        Ok(ModelInfo {
            model: self.model.clone(),
            dimension: self.dimension,
            max_tokens: 8192,
        })
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(inputs: &[&str]) -> BatchEmbeddingRequest {
        BatchEmbeddingRequest {
            model: MockEmbeddingProvider::DEFAULT_MODEL.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            normalize: false,
        }
    }

    #[tokio::test]
    async fn mock_provider_is_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let a = provider.embed_batch(request(&["hello world"])).await.unwrap();
        let b = provider.embed_batch(request(&["hello world"])).await.unwrap();
        assert_eq!(a.embeddings, b.embeddings);
    }

    #[tokio::test]
    async fn one_vector_per_input_with_the_declared_dimension() {
        let provider = MockEmbeddingProvider::with_dimension(16);
        let response = provider
            .embed_batch(BatchEmbeddingRequest {
                model: "mock-embed-16".to_string(),
                inputs: vec!["a".into(), "b".into(), "c".into()],
                normalize: false,
            })
            .await
            .unwrap();
        assert_eq!(response.embeddings.len(), 3);
        assert!(response.embeddings.iter().all(|e| e.len() == 16));
    }

    #[tokio::test]
    async fn distinct_inputs_embed_differently() {
        let provider = MockEmbeddingProvider::new();
        let response = provider.embed_batch(request(&["one", "two"])).await.unwrap();
        assert_ne!(response.embeddings[0], response.embeddings[1]);
    }

    #[tokio::test]
    async fn normalized_vectors_have_unit_magnitude() {
        let provider = MockEmbeddingProvider::new();
        let response = provider
            .embed_batch(BatchEmbeddingRequest {
                model: MockEmbeddingProvider::DEFAULT_MODEL.to_string(),
                inputs: vec!["normalize me".into()],
                normalize: true,
            })
            .await
            .unwrap();
        let magnitude: f32 = response.embeddings[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let provider = MockEmbeddingProvider::new();
        let err = provider.embed_batch(request(&[])).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn model_info_reports_the_configured_dimension() {
        let provider = MockEmbeddingProvider::with_dimension(256);
        let info = provider.model_info().await.unwrap();
        assert_eq!(info.dimension, 256);
        assert_eq!(info.model, "mock-embed-256");
        assert!(provider.health_check().await.is_ok());
    }
}
