//! Knowledge ingestion pipeline: split, embed, persist.

use std::sync::Arc;

use tracing::{info, warn};

use tmai_core::{
    chunk_text, ChunkRecord, CoreError, CoreResult, DocumentDescriptor, DocumentRepository,
    IngestReport, ServiceId,
};
use tmai_embedding::{BatchEmbeddingRequest, EmbeddingError, EmbeddingProvider};

/// Ingests owner-supplied text into embedded, retrievable chunks.
pub struct IngestionPipeline {
    documents: Arc<dyn DocumentRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    embedding_model: String,
    embedding_dimension: u32,
    max_chunk_chars: usize,
}

impl IngestionPipeline {
    /// Creates a new pipeline.
    #[must_use]
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        embedding_model: String,
        embedding_dimension: u32,
        max_chunk_chars: usize,
    ) -> Self {
        Self {
            documents,
            embedder,
            embedding_model,
            embedding_dimension,
            max_chunk_chars,
        }
    }

    /// Splits `text`, embeds every chunk in one batched call, and
    /// persists the document plus its chunks.
    ///
    /// Zero chunks fail with `InvalidInput` before any store write. A
    /// vector count or dimension mismatch is a fatal `EmbeddingMismatch`:
    /// no mismatched vectors are committed. Chunk inserts run with
    /// ordered-false semantics: one bad chunk does not block the rest,
    /// and the report carries how many made it.
    pub async fn ingest(
        &self,
        service_id: ServiceId,
        title: Option<String>,
        text: &str,
    ) -> CoreResult<IngestReport> {
        let pieces = chunk_text(text, self.max_chunk_chars);
        if pieces.is_empty() {
            return Err(CoreError::invalid_input("text produced no chunks"));
        }
        let total_chunks = pieces.len();

        let response = self
            .embedder
            .embed_batch(BatchEmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: pieces.clone(),
                normalize: false,
            })
            .await
            .map_err(map_embedding_error)?;

        if response.embeddings.len() != total_chunks {
            return Err(CoreError::embedding_mismatch(format!(
                "expected {total_chunks} vectors, got {}",
                response.embeddings.len()
            )));
        }
        let expected = self.embedding_dimension as usize;
        if let Some(bad) = response.embeddings.iter().find(|e| e.len() != expected) {
            return Err(CoreError::embedding_mismatch(format!(
                "expected dimension {expected}, got {}",
                bad.len()
            )));
        }

        let document = DocumentDescriptor::new(
            service_id,
            title.unwrap_or_else(|| "Untitled".to_string()),
            "upload",
        );
        self.documents.create_document(&document).await?;

        let mut chunks_inserted = 0;
        for (position, (piece, embedding)) in
            pieces.into_iter().zip(response.embeddings).enumerate()
        {
            let chunk = ChunkRecord::new(
                document.document_id,
                service_id,
                position as u32,
                piece,
                embedding,
            );
            match self.documents.insert_chunk(&chunk).await {
                Ok(()) => chunks_inserted += 1,
                Err(err) => {
                    warn!(
                        document_id = %document.document_id,
                        position,
                        error = %err,
                        "chunk insert failed"
                    );
                }
            }
        }

        info!(
            document_id = %document.document_id,
            chunks_inserted,
            total_chunks,
            "ingested document"
        );

        Ok(IngestReport {
            document_id: document.document_id,
            chunks_inserted,
            total_chunks,
        })
    }
}

/// Translates embedding-provider errors into the core taxonomy.
///
/// Contract violations are integration faults (`EmbeddingMismatch`);
/// everything else is an upstream failure.
pub(crate) fn map_embedding_error(err: EmbeddingError) -> CoreError {
    match err {
        EmbeddingError::ContractViolation(message) => CoreError::embedding_mismatch(message),
        EmbeddingError::InvalidInput(message) => CoreError::invalid_input(message),
        other => CoreError::upstream(other.to_string()),
    }
}
