//! Knowledge document and chunk domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChunkId, DocumentId, ServiceId};

/// An owner-supplied text blob under a service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Unique identifier for this document.
    pub document_id: DocumentId,

    /// Service the document belongs to.
    pub service_id: ServiceId,

    /// Display title.
    pub title: String,

    /// Where the text came from (e.g. `"upload"`).
    pub source: String,

    /// When this document was ingested.
    pub created_at: DateTime<Utc>,

    /// When this document was revoked from retrieval (None = active).
    pub revoked_at: Option<DateTime<Utc>>,
}

impl DocumentDescriptor {
    /// Creates a new active document descriptor.
    #[must_use]
    pub fn new(service_id: ServiceId, title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            document_id: DocumentId::new(),
            service_id,
            title: title.into(),
            source: source.into(),
            created_at: Utc::now(),
            revoked_at: None,
        }
    }

    /// Checks whether this document has been revoked.
    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// A position-indexed slice of a document's text plus its embedding.
///
/// The position is unique within the parent document; the embedding
/// dimensionality matches the embedding model's fixed output size.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier for this chunk.
    pub chunk_id: ChunkId,

    /// Parent document.
    pub document_id: DocumentId,

    /// Service scope, denormalized for scoped retrieval scans.
    pub service_id: ServiceId,

    /// Zero-based position within the parent document.
    pub position: u32,

    /// Chunk text.
    pub text: String,

    /// Dense embedding vector.
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    /// Creates a new chunk record.
    #[must_use]
    pub fn new(
        document_id: DocumentId,
        service_id: ServiceId,
        position: u32,
        text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            chunk_id: ChunkId::new(),
            document_id,
            service_id,
            position,
            text: text.into(),
            embedding,
        }
    }

    /// Returns the dimension of the embedding vector.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// One ranked retrieval hit: chunk text plus similarity score.
#[derive(Clone, Debug, Serialize)]
pub struct RetrievedChunk {
    /// Identifier of the matching chunk.
    pub chunk_id: ChunkId,
    /// Parent document of the chunk.
    pub document_id: DocumentId,
    /// Position of the chunk within its document.
    pub position: u32,
    /// Chunk text to ground generation with.
    pub text: String,
    /// Cosine similarity against the query embedding; higher is better.
    pub score: f32,
}

/// Outcome of one ingestion call.
///
/// `chunks_inserted` may be less than `total_chunks`: one bad chunk does
/// not block the rest, and partial failures are reported, not rolled back.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct IngestReport {
    /// Identifier of the persisted parent document.
    pub document_id: DocumentId,
    /// Chunks actually persisted.
    pub chunks_inserted: usize,
    /// Chunks produced by the splitter.
    pub total_chunks: usize,
}
