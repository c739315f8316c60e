//! Service-scoped nearest-neighbor retrieval.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use tmai_core::{cosine_similarity, CoreResult, DocumentRepository, RetrievedChunk, ServiceId};

/// Retrieves the chunks most similar to a query embedding, restricted to
/// one service's documents.
///
/// The scan is pre-scoped in the store (`WHERE service_id = ?`), so
/// cross-tenant chunks are unreachable by construction rather than
/// filtered after the fact.
pub struct Retriever {
    documents: Arc<dyn DocumentRepository>,
    top_k: usize,
    candidate_pool: usize,
}

impl Retriever {
    /// Creates a new retriever.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentRepository>, top_k: usize, candidate_pool: usize) -> Self {
        Self {
            documents,
            top_k,
            candidate_pool,
        }
    }

    /// Returns up to `top_k` chunks ranked best-first by cosine
    /// similarity. An empty result is valid and falls back to ungrounded
    /// generation upstream.
    pub async fn retrieve(
        &self,
        service_id: ServiceId,
        query: &[f32],
    ) -> CoreResult<Vec<RetrievedChunk>> {
        let chunks = self.documents.chunks_by_service(service_id).await?;

        let mut scored: Vec<RetrievedChunk> = chunks
            .into_iter()
            .filter(|chunk| {
                // A chunk embedded under a different model dimension can
                // never be compared to this query.
                let comparable = chunk.embedding.len() == query.len();
                if !comparable {
                    debug!(chunk_id = %chunk.chunk_id, "skipping chunk with foreign dimension");
                }
                comparable
            })
            .map(|chunk| RetrievedChunk {
                score: cosine_similarity(query, &chunk.embedding),
                chunk_id: chunk.chunk_id,
                document_id: chunk.document_id,
                position: chunk.position,
                text: chunk.text,
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(self.candidate_pool);
        scored.truncate(self.top_k);
        Ok(scored)
    }
}
