//! Key issuance.

use std::sync::Arc;

use tracing::info;

use tmai_core::{
    generate_secret, hash_secret, ApiKeyDescriptor, ApiKeyRepository, CoreResult, IssuedKey,
    KeyLimits, ServiceId, TenantId,
};

use crate::validation::validate_key_name;

/// Issues new API keys with server-controlled default limits.
pub struct KeyIssuer {
    api_keys: Arc<dyn ApiKeyRepository>,
    default_limits: KeyLimits,
}

impl KeyIssuer {
    /// Creates a new issuer.
    #[must_use]
    pub fn new(api_keys: Arc<dyn ApiKeyRepository>, default_limits: KeyLimits) -> Self {
        Self {
            api_keys,
            default_limits,
        }
    }

    /// Issues a new key bound to `(tenant, service)`.
    ///
    /// The secret is generated server-side and returned exactly once in
    /// the [`IssuedKey`]; only its hash is persisted. Limits are the
    /// server defaults, never client-supplied. A hash collision surfaces
    /// as `AlreadyExists`; the caller retries with a fresh secret.
    pub async fn issue(
        &self,
        tenant_id: TenantId,
        service_id: ServiceId,
        name: &str,
    ) -> CoreResult<IssuedKey> {
        validate_key_name(name)?;

        let secret = generate_secret();
        let descriptor = ApiKeyDescriptor::for_secret(
            tenant_id,
            service_id,
            name.trim(),
            &secret,
            self.default_limits,
        );
        self.api_keys
            .create(&descriptor, &hash_secret(&secret))
            .await?;

        info!(key_id = %descriptor.key_id, service_id = %service_id, "issued API key");

        Ok(IssuedKey { descriptor, secret })
    }
}
