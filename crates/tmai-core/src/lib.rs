//! Core domain types and traits for the TMAI chat platform.

pub mod auth;
pub mod chat;
pub mod chunker;
pub mod document;
pub mod error;
pub mod ids;
pub mod prompt;
pub mod service;
pub mod traits;
pub mod usage;
pub mod vector;

pub use auth::{
    generate_secret, hash_secret, is_valid_secret_format, ApiKeyDescriptor, IssuedKey, KeyLimits,
    ScopedKey, DISPLAY_PREFIX_LEN, SECRET_LEN, SECRET_PREFIX,
};
pub use chat::{ChatRole, ChatTurn};
pub use chunker::chunk_text;
pub use document::{ChunkRecord, DocumentDescriptor, IngestReport, RetrievedChunk};
pub use error::{CoreError, CoreResult};
pub use ids::{ApiKeyId, ChunkId, DocumentId, ServiceId, TenantId};
pub use prompt::{assemble, EffectiveConfig, PromptConfig, PromptField, HISTORY_WINDOW};
pub use service::ServiceDescriptor;
pub use traits::{
    ApiKeyRepository, DocumentRepository, ServiceCatalog, SessionIdentity, SessionVerifier,
    UsageCounterStore,
};
pub use usage::WindowKind;
pub use vector::{cosine_similarity, dot_product};
