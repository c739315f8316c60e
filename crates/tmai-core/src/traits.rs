use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::ApiKeyDescriptor;
use crate::document::{ChunkRecord, DocumentDescriptor};
use crate::error::CoreResult;
use crate::ids::{ApiKeyId, DocumentId, ServiceId, TenantId};
use crate::service::ServiceDescriptor;
use crate::usage::WindowKind;

/// Repository interface for persisted API key records.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Persists a newly issued key with its secret hash.
    ///
    /// Fails with `AlreadyExists` when the hash collides with an existing
    /// record; the caller retries with a fresh secret.
    async fn create(&self, descriptor: &ApiKeyDescriptor, key_hash: &str) -> CoreResult<()>;

    /// Fetches a key by its identifier.
    async fn get(&self, key_id: ApiKeyId) -> CoreResult<Option<ApiKeyDescriptor>>;

    /// Resolves a key by the hash of a presented secret. Lookup is always
    /// by full hash, never by display prefix.
    async fn find_by_hash(&self, key_hash: &str) -> CoreResult<Option<ApiKeyDescriptor>>;

    /// Lists all keys bound to a service, newest first.
    async fn list_by_service(&self, service_id: ServiceId) -> CoreResult<Vec<ApiKeyDescriptor>>;

    /// Sets the revocation timestamp. Idempotent: revoking an
    /// already-revoked key succeeds and keeps the original timestamp.
    async fn revoke(&self, key_id: ApiKeyId, at: DateTime<Utc>) -> CoreResult<()>;

    /// Hard-deletes a key and cascades its usage counters.
    ///
    /// Fails with `Conflict` unless the key was revoked first.
    async fn delete(&self, key_id: ApiKeyId) -> CoreResult<()>;

    /// Stamps the key's last-used time. Observability only; callers treat
    /// failures as non-fatal.
    async fn touch_last_used(&self, key_id: ApiKeyId, at: DateTime<Utc>) -> CoreResult<()>;
}

/// Store interface for fixed-window usage counters.
#[async_trait]
pub trait UsageCounterStore: Send + Sync {
    /// Atomically increments the counter for `(key, kind, window_start)`,
    /// conditioned on the row not existing yet or its count being
    /// strictly under `limit`. One round trip to the store; never a
    /// separate read-then-write.
    ///
    /// Returns `true` when the increment was applied, `false` when the
    /// window is exhausted.
    async fn try_consume(
        &self,
        key_id: ApiKeyId,
        kind: WindowKind,
        window_start: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        limit: u32,
    ) -> CoreResult<bool>;

    /// Reads the current count for a window. Zero when no row exists.
    async fn window_count(
        &self,
        key_id: ApiKeyId,
        kind: WindowKind,
        window_start: DateTime<Utc>,
    ) -> CoreResult<u32>;

    /// Reclaims rows whose expiry has passed. Returns rows removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> CoreResult<u64>;
}

/// Catalog interface for tenant-configured chat services.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Persists a new service. Fails with `AlreadyExists` when the slug
    /// is taken.
    async fn create(&self, service: &ServiceDescriptor) -> CoreResult<()>;

    /// Fetches a service by its identifier.
    async fn get(&self, service_id: ServiceId) -> CoreResult<Option<ServiceDescriptor>>;

    /// Lists all services owned by a tenant ordered by creation time.
    async fn list_by_tenant(&self, tenant_id: TenantId) -> CoreResult<Vec<ServiceDescriptor>>;
}

/// Repository interface for knowledge documents and their chunks.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Persists a new document descriptor.
    async fn create_document(&self, document: &DocumentDescriptor) -> CoreResult<()>;

    /// Fetches a document by its identifier.
    async fn get_document(&self, document_id: DocumentId) -> CoreResult<Option<DocumentDescriptor>>;

    /// Inserts one chunk. Fails with `AlreadyExists` when the
    /// (document, position) pair is already present.
    async fn insert_chunk(&self, chunk: &ChunkRecord) -> CoreResult<()>;

    /// Scans every active chunk belonging to a service. The scan is
    /// pre-scoped in the store; cross-tenant rows are unreachable.
    async fn chunks_by_service(&self, service_id: ServiceId) -> CoreResult<Vec<ChunkRecord>>;

    /// Deletes a document and all of its chunks.
    async fn delete_document(&self, document_id: DocumentId) -> CoreResult<()>;
}

/// Identity resolved from a verified first-party session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Tenant the session acts for.
    pub tenant_id: TenantId,
}

/// Session authentication boundary.
///
/// Session auth and its provider integrations are an external
/// collaborator; the core only needs "token resolves to a tenant or it
/// does not".
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// Resolves a presented session token to an identity, or `None` when
    /// the token is unknown or expired.
    async fn verify(&self, token: &str) -> CoreResult<Option<SessionIdentity>>;
}
