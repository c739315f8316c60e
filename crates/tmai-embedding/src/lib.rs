//! Embedding provider abstraction for the TMAI ingestion and chat
//! pipelines.
//!
//! The provider contract is typed at the adapter edge: every adapter
//! validates vector count and dimensionality before handing results to
//! callers, so the pipelines downstream consume plain `Vec<f32>` vectors
//! without re-checking shapes.

mod mock;
mod provider;
mod remote;
mod types;

pub use mock::MockEmbeddingProvider;
pub use provider::EmbeddingProvider;
pub use remote::{RemoteEmbeddingConfig, RemoteEmbeddingProvider};
pub use types::{
    BatchEmbeddingRequest, BatchEmbeddingResponse, EmbeddingError, EmbeddingResult, ModelInfo,
    Usage,
};
