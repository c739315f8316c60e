//! API key domain types and credential primitives.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ApiKeyId, ServiceId, TenantId};

/// Recognizable prefix carried by every issued secret.
pub const SECRET_PREFIX: &str = "tmai_";

/// Number of random bytes backing a secret.
pub const SECRET_RANDOM_BYTES: usize = 32;

/// Total length of a well-formed secret: the prefix plus 43 chars of
/// base64url-no-padding over [`SECRET_RANDOM_BYTES`] random bytes.
pub const SECRET_LEN: usize = 48;

/// Length of the non-secret display prefix stored alongside the record.
pub const DISPLAY_PREFIX_LEN: usize = 12;

/// Request limits configured per key, one per window kind.
///
/// `None` means unlimited along that axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLimits {
    /// Maximum requests per UTC minute window.
    pub per_minute: Option<u32>,
    /// Maximum requests per UTC calendar-month window.
    pub per_month: Option<u32>,
}

impl KeyLimits {
    /// Default per-minute allocation for newly issued keys.
    pub const DEFAULT_PER_MINUTE: u32 = 60;
    /// Default per-month allocation for newly issued keys.
    pub const DEFAULT_PER_MONTH: u32 = 10_000;

    /// Creates the server-controlled default limits applied at issuance.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            per_minute: Some(Self::DEFAULT_PER_MINUTE),
            per_month: Some(Self::DEFAULT_PER_MONTH),
        }
    }

    /// Creates limits with no cap along either axis.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            per_minute: None,
            per_month: None,
        }
    }
}

impl Default for KeyLimits {
    fn default() -> Self {
        Self::standard()
    }
}

/// Persisted API key record. The plaintext secret is never stored; its
/// SHA-256 hash is the unique lookup column.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiKeyDescriptor {
    /// Unique identifier for this API key.
    pub key_id: ApiKeyId,

    /// Tenant this API key belongs to.
    pub tenant_id: TenantId,

    /// Service this API key is bound to.
    pub service_id: ServiceId,

    /// Human-readable label for the API key.
    pub name: String,

    /// Non-secret leading characters of the secret, for display and search.
    pub key_prefix: String,

    /// Last four characters of the secret, for display.
    pub last_four: String,

    /// Request limits enforced per window kind.
    pub limits: KeyLimits,

    /// When this API key was created.
    pub created_at: DateTime<Utc>,

    /// When this API key was revoked (None = active).
    pub revoked_at: Option<DateTime<Utc>>,

    /// When this API key last authenticated a request (None = never used).
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKeyDescriptor {
    /// Creates a descriptor for a freshly generated secret, deriving the
    /// display prefix and last-four suffix from the plaintext.
    #[must_use]
    pub fn for_secret(
        tenant_id: TenantId,
        service_id: ServiceId,
        name: impl Into<String>,
        secret: &str,
        limits: KeyLimits,
    ) -> Self {
        Self {
            key_id: ApiKeyId::new(),
            tenant_id,
            service_id,
            name: name.into(),
            key_prefix: display_prefix(secret),
            last_four: last_four(secret),
            limits,
            created_at: Utc::now(),
            revoked_at: None,
            last_used_at: None,
        }
    }

    /// Checks whether this API key has been revoked.
    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns the authorization scope this key grants.
    #[must_use]
    pub const fn scope(&self) -> ScopedKey {
        ScopedKey {
            key_id: self.key_id,
            tenant_id: self.tenant_id,
            service_id: self.service_id,
            limits: self.limits,
        }
    }
}

/// Response to a successful key issuance.
/// The plaintext secret is only observable here, exactly once.
#[derive(Clone, Debug, Serialize)]
pub struct IssuedKey {
    /// Descriptor as persisted.
    #[serde(flatten)]
    pub descriptor: ApiKeyDescriptor,

    /// Plaintext secret (only returned during issuance).
    pub secret: String,
}

/// Authorization scope resolved from an authenticated credential.
///
/// Authentication yields a scope without granting use; quota enforcement
/// is a separate, subsequent step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopedKey {
    /// Identifier of the authenticated key.
    pub key_id: ApiKeyId,
    /// Tenant the key acts for.
    pub tenant_id: TenantId,
    /// Service the key is bound to.
    pub service_id: ServiceId,
    /// Window limits configured for the key.
    pub limits: KeyLimits,
}

/// Generates a new API key secret from 32 bytes of OS randomness.
/// Returns the secret in format: `tmai_` + 43 chars base64url, no padding.
#[must_use]
pub fn generate_secret() -> String {
    let mut key_bytes = [0u8; SECRET_RANDOM_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut key_bytes);
    format!("{SECRET_PREFIX}{}", URL_SAFE_NO_PAD.encode(key_bytes))
}

/// Hashes an API key secret using SHA-256.
/// Returns the hex-encoded hash suitable for storage and lookup.
#[must_use]
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validates a presented secret's format without touching storage.
///
/// This is the cheap pre-filter in front of the hash lookup: correct
/// prefix, exact length, and base64url alphabet for the random part.
#[must_use]
pub fn is_valid_secret_format(secret: &str) -> bool {
    if secret.len() != SECRET_LEN {
        return false;
    }
    let Some(rest) = secret.strip_prefix(SECRET_PREFIX) else {
        return false;
    };
    rest.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Returns the non-secret display prefix of a secret.
#[must_use]
pub fn display_prefix(secret: &str) -> String {
    secret.chars().take(DISPLAY_PREFIX_LEN).collect()
}

/// Returns the last-four display suffix of a secret.
#[must_use]
pub fn last_four(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    chars[chars.len().saturating_sub(4)..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_has_expected_format() {
        let secret = generate_secret();
        assert!(secret.starts_with(SECRET_PREFIX));
        assert_eq!(secret.len(), SECRET_LEN);
        assert!(is_valid_secret_format(&secret));
    }

    #[test]
    fn generated_secrets_are_unique() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_stable_and_hex() {
        let secret = generate_secret();
        let hash = hash_secret(&secret);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_secret(&secret));
    }

    #[test]
    fn different_secrets_hash_differently() {
        assert_ne!(hash_secret(&generate_secret()), hash_secret(&generate_secret()));
    }

    #[test]
    fn format_prefilter_rejects_bad_shapes() {
        assert!(!is_valid_secret_format(""));
        assert!(!is_valid_secret_format("tmai_short"));
        // Right length, wrong prefix.
        assert!(!is_valid_secret_format(&format!("sk__{}", "a".repeat(44))));
        // Right prefix and length, illegal character.
        assert!(!is_valid_secret_format(&format!("tmai_{}!", "a".repeat(42))));
    }

    #[test]
    fn descriptor_derives_display_fields() {
        let secret = generate_secret();
        let descriptor = ApiKeyDescriptor::for_secret(
            TenantId::new(),
            ServiceId::new(),
            "prod key",
            &secret,
            KeyLimits::standard(),
        );

        assert_eq!(descriptor.key_prefix.len(), DISPLAY_PREFIX_LEN);
        assert!(secret.starts_with(&descriptor.key_prefix));
        assert!(secret.ends_with(&descriptor.last_four));
        assert_eq!(descriptor.limits.per_minute, Some(KeyLimits::DEFAULT_PER_MINUTE));
        assert!(!descriptor.is_revoked());
        assert!(descriptor.last_used_at.is_none());
    }

    #[test]
    fn scope_carries_binding_and_limits() {
        let secret = generate_secret();
        let descriptor = ApiKeyDescriptor::for_secret(
            TenantId::new(),
            ServiceId::new(),
            "scoped",
            &secret,
            KeyLimits::unlimited(),
        );
        let scope = descriptor.scope();
        assert_eq!(scope.key_id, descriptor.key_id);
        assert_eq!(scope.service_id, descriptor.service_id);
        assert_eq!(scope.limits, KeyLimits::unlimited());
    }
}
