use thiserror::Error;

use crate::usage::WindowKind;

/// Canonical error type shared by every TMAI component.
///
/// Variants map one-to-one onto the gateway's HTTP status taxonomy; the
/// translation itself lives at the API boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or missing request fields; the caller can fix and retry.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Human-readable description of what was malformed.
        message: String,
    },

    /// Missing, malformed, unknown, or revoked credential.
    #[error("unauthenticated: {message}")]
    Unauthenticated {
        /// Human-readable rejection reason. Never echoes the credential.
        message: String,
    },

    /// Valid credential, but the requested scope does not belong to it.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Human-readable description of the scope violation.
        message: String,
    },

    /// Entity was not found in the backing store.
    #[error("{entity} `{id}` was not found")]
    NotFound {
        /// Entity type name (e.g. `"service"`).
        entity: &'static str,
        /// Identifier of the missing entity.
        id: String,
    },

    /// Entity already exists and cannot be created again.
    #[error("{entity} `{id}` already exists")]
    AlreadyExists {
        /// Entity type name (e.g. `"api_key"`).
        entity: &'static str,
        /// Identifier that conflicts.
        id: String,
    },

    /// Operation conflicts with the entity's current state.
    #[error("conflict: {message}")]
    Conflict {
        /// Human-readable explanation of the conflicting state.
        message: String,
    },

    /// A fixed usage window for the key is exhausted.
    #[error("rate limit exceeded for the {window} window")]
    RateLimited {
        /// Which window kind rejected the request.
        window: WindowKind,
    },

    /// Embedding or generation provider failed; surfaced as-is, not retried.
    #[error("upstream provider failure: {message}")]
    Upstream {
        /// Human-readable provider failure description.
        message: String,
    },

    /// The embedding provider violated its typed contract.
    #[error("embedding contract violated: {message}")]
    EmbeddingMismatch {
        /// What part of the contract did not hold.
        message: String,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Unexpected internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },
}

impl CoreError {
    /// Creates an `InvalidInput` variant.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an `Unauthenticated` variant.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Creates a `Forbidden` variant.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a `NotFound` variant.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an `AlreadyExists` variant.
    #[must_use]
    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    /// Creates a `Conflict` variant.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a `RateLimited` variant.
    #[must_use]
    pub const fn rate_limited(window: WindowKind) -> Self {
        Self::RateLimited { window }
    }

    /// Creates an `Upstream` variant.
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Creates an `EmbeddingMismatch` variant.
    #[must_use]
    pub fn embedding_mismatch(message: impl Into<String>) -> Self {
        Self::EmbeddingMismatch {
            message: message.into(),
        }
    }

    /// Creates a `Storage` variant.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization failed: {err}"),
        }
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
