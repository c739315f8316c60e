//! Credential authentication.

use std::sync::Arc;

use tracing::debug;

use tmai_core::{
    hash_secret, is_valid_secret_format, ApiKeyRepository, CoreError, CoreResult, ScopedKey,
};

/// Resolves presented secrets to authorization scopes.
///
/// Authentication does not grant use: quota enforcement is a separate,
/// subsequent step, so the two concerns stay independently testable.
pub struct Authenticator {
    api_keys: Arc<dyn ApiKeyRepository>,
}

impl Authenticator {
    /// Creates a new authenticator.
    #[must_use]
    pub fn new(api_keys: Arc<dyn ApiKeyRepository>) -> Self {
        Self { api_keys }
    }

    /// Authenticates a presented secret.
    ///
    /// The format pre-filter rejects malformed input before any storage
    /// access. Lookup is by full hash, never by display prefix, and a
    /// revoked record fails exactly like an unknown one.
    pub async fn authenticate(&self, presented: &str) -> CoreResult<ScopedKey> {
        if !is_valid_secret_format(presented) {
            debug!("rejected credential on format pre-filter");
            return Err(CoreError::unauthenticated("malformed API key"));
        }

        let descriptor = self
            .api_keys
            .find_by_hash(&hash_secret(presented))
            .await?
            .ok_or_else(|| CoreError::unauthenticated("unknown API key"))?;

        if descriptor.is_revoked() {
            return Err(CoreError::unauthenticated("API key has been revoked"));
        }

        Ok(descriptor.scope())
    }
}
