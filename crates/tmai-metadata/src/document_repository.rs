//! SQLite implementation of the document and chunk repository.
//!
//! Embeddings are serialized as binary blobs using bincode. Chunk scans
//! are pre-scoped by service id and skip revoked documents.

use async_trait::async_trait;
use sqlx::{query, Row, SqlitePool};

use tmai_core::{
    ChunkId, ChunkRecord, CoreError, CoreResult, DocumentDescriptor, DocumentId,
    DocumentRepository, ServiceId,
};

use crate::util::{
    is_foreign_key_violation, is_unique_violation, parse_optional_timestamp, parse_timestamp,
};

/// SQLite implementation of [`DocumentRepository`].
pub struct SqliteDocumentRepository {
    pool: SqlitePool,
}

impl SqliteDocumentRepository {
    /// Creates a new SQLite document repository.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn create_document(&self, document: &DocumentDescriptor) -> CoreResult<()> {
        query(
            "INSERT INTO documents (document_id, service_id, title, source, created_at, revoked_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(document.document_id.to_bytes().to_vec())
        .bind(document.service_id.to_bytes().to_vec())
        .bind(&document.title)
        .bind(&document.source)
        .bind(document.created_at.to_rfc3339())
        .bind(document.revoked_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::already_exists("document", document.document_id.to_string())
            } else if is_foreign_key_violation(&e) {
                CoreError::not_found("service", document.service_id.to_string())
            } else {
                CoreError::storage(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn get_document(&self, document_id: DocumentId) -> CoreResult<Option<DocumentDescriptor>> {
        let row = query(
            "SELECT document_id, service_id, title, source, created_at, revoked_at
             FROM documents WHERE document_id = ?1",
        )
        .bind(document_id.to_bytes().to_vec())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::storage(e.to_string()))?;

        row.map(|r| parse_document_row(&r)).transpose()
    }

    async fn insert_chunk(&self, chunk: &ChunkRecord) -> CoreResult<()> {
        let embedding = bincode::serialize(&chunk.embedding)
            .map_err(|e| CoreError::internal(format!("Failed to serialize embedding: {e}")))?;

        query(
            "INSERT INTO chunks (chunk_id, document_id, service_id, position, text, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(chunk.chunk_id.to_bytes().to_vec())
        .bind(chunk.document_id.to_bytes().to_vec())
        .bind(chunk.service_id.to_bytes().to_vec())
        .bind(i64::from(chunk.position))
        .bind(&chunk.text)
        .bind(embedding)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::already_exists(
                    "chunk",
                    format!("{}#{}", chunk.document_id, chunk.position),
                )
            } else if is_foreign_key_violation(&e) {
                CoreError::not_found("document", chunk.document_id.to_string())
            } else {
                CoreError::storage(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn chunks_by_service(&self, service_id: ServiceId) -> CoreResult<Vec<ChunkRecord>> {
        let rows = query(
            "SELECT c.chunk_id, c.document_id, c.service_id, c.position, c.text, c.embedding
             FROM chunks c
             JOIN documents d ON d.document_id = c.document_id
             WHERE c.service_id = ?1 AND d.revoked_at IS NULL
             ORDER BY c.document_id, c.position",
        )
        .bind(service_id.to_bytes().to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::storage(e.to_string()))?;

        rows.iter().map(parse_chunk_row).collect()
    }

    async fn delete_document(&self, document_id: DocumentId) -> CoreResult<()> {
        // Chunks cascade via the chunks foreign key.
        let result = query("DELETE FROM documents WHERE document_id = ?1")
            .bind(document_id.to_bytes().to_vec())
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("document", document_id.to_string()));
        }

        Ok(())
    }
}

/// Parses a SQLite row into a [`DocumentDescriptor`].
fn parse_document_row(row: &sqlx::sqlite::SqliteRow) -> CoreResult<DocumentDescriptor> {
    let document_id_bytes: Vec<u8> = row
        .try_get("document_id")
        .map_err(|e| CoreError::storage(format!("Failed to get document_id: {e}")))?;
    let document_id = DocumentId::from_bytes(&document_id_bytes)
        .map_err(|e| CoreError::storage(format!("Invalid document_id: {e}")))?;

    let service_id_bytes: Vec<u8> = row
        .try_get("service_id")
        .map_err(|e| CoreError::storage(format!("Failed to get service_id: {e}")))?;
    let service_id = ServiceId::from_bytes(&service_id_bytes)
        .map_err(|e| CoreError::storage(format!("Invalid service_id: {e}")))?;

    let title: String = row
        .try_get("title")
        .map_err(|e| CoreError::storage(format!("Failed to get title: {e}")))?;
    let source: String = row
        .try_get("source")
        .map_err(|e| CoreError::storage(format!("Failed to get source: {e}")))?;

    let created_at = parse_timestamp(row, "created_at")?;
    let revoked_at = parse_optional_timestamp(row, "revoked_at")?;

    Ok(DocumentDescriptor {
        document_id,
        service_id,
        title,
        source,
        created_at,
        revoked_at,
    })
}

/// Parses a SQLite row into a [`ChunkRecord`].
fn parse_chunk_row(row: &sqlx::sqlite::SqliteRow) -> CoreResult<ChunkRecord> {
    let chunk_id_bytes: Vec<u8> = row
        .try_get("chunk_id")
        .map_err(|e| CoreError::storage(format!("Failed to get chunk_id: {e}")))?;
    let chunk_id = ChunkId::from_bytes(&chunk_id_bytes)
        .map_err(|e| CoreError::storage(format!("Invalid chunk_id: {e}")))?;

    let document_id_bytes: Vec<u8> = row
        .try_get("document_id")
        .map_err(|e| CoreError::storage(format!("Failed to get document_id: {e}")))?;
    let document_id = DocumentId::from_bytes(&document_id_bytes)
        .map_err(|e| CoreError::storage(format!("Invalid document_id: {e}")))?;

    let service_id_bytes: Vec<u8> = row
        .try_get("service_id")
        .map_err(|e| CoreError::storage(format!("Failed to get service_id: {e}")))?;
    let service_id = ServiceId::from_bytes(&service_id_bytes)
        .map_err(|e| CoreError::storage(format!("Invalid service_id: {e}")))?;

    let position: i64 = row
        .try_get("position")
        .map_err(|e| CoreError::storage(format!("Failed to get position: {e}")))?;

    let text: String = row
        .try_get("text")
        .map_err(|e| CoreError::storage(format!("Failed to get text: {e}")))?;

    let embedding_bytes: Vec<u8> = row
        .try_get("embedding")
        .map_err(|e| CoreError::storage(format!("Failed to get embedding: {e}")))?;
    let embedding: Vec<f32> = bincode::deserialize(&embedding_bytes)
        .map_err(|e| CoreError::storage(format!("Invalid embedding blob: {e}")))?;

    Ok(ChunkRecord {
        chunk_id,
        document_id,
        service_id,
        position: position as u32,
        text,
        embedding,
    })
}
