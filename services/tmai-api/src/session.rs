//! Static session verifier: the session-auth collaborator boundary.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;

use tmai_core::{CoreError, CoreResult, SessionIdentity, SessionVerifier, TenantId};

/// Session verifier backed by a static token-to-tenant map.
///
/// Real session authentication (providers, cookies, expiry) lives outside
/// this service; deployments hand the gateway a fixed set of first-party
/// tokens through configuration.
pub struct StaticSessionVerifier {
    tokens: HashMap<String, TenantId>,
}

impl StaticSessionVerifier {
    /// Creates a verifier from resolved token-to-tenant pairs.
    #[must_use]
    pub fn new(tokens: HashMap<String, TenantId>) -> Self {
        Self { tokens }
    }

    /// Creates a verifier from configuration strings, parsing tenant UUIDs.
    ///
    /// # Errors
    ///
    /// Fails when a configured tenant id is not a valid UUID.
    pub fn from_config(tokens: &HashMap<String, String>) -> CoreResult<Self> {
        let mut resolved = HashMap::with_capacity(tokens.len());
        for (token, tenant) in tokens {
            let tenant_id = TenantId::from_str(tenant).map_err(|e| {
                CoreError::internal(format!("invalid tenant id `{tenant}` in session config: {e}"))
            })?;
            resolved.insert(token.clone(), tenant_id);
        }
        Ok(Self { tokens: resolved })
    }
}

#[async_trait]
impl SessionVerifier for StaticSessionVerifier {
    async fn verify(&self, token: &str) -> CoreResult<Option<SessionIdentity>> {
        Ok(self
            .tokens
            .get(token)
            .map(|tenant_id| SessionIdentity {
                tenant_id: *tenant_id,
            }))
    }
}
