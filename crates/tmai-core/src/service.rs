//! Chat service domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prompt::PromptConfig;
use crate::{ServiceId, TenantId};

/// A tenant-configured chat service: the unit every key, document, and
/// chunk is scoped to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Unique identifier for this service.
    pub service_id: ServiceId,

    /// Owning tenant.
    pub tenant_id: TenantId,

    /// Display name.
    pub name: String,

    /// URL-safe slug, unique across the platform.
    pub slug: String,

    /// Legacy single-string system prompt, superseded by `prompt_config`.
    pub system_prompt: Option<String>,

    /// Structured prompt override merged over the platform default.
    pub prompt_config: Option<PromptConfig>,

    /// When this service was created.
    pub created_at: DateTime<Utc>,
}

impl ServiceDescriptor {
    /// Creates a new service descriptor.
    #[must_use]
    pub fn new(tenant_id: TenantId, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            service_id: ServiceId::new(),
            tenant_id,
            name: name.into(),
            slug: slug.into(),
            system_prompt: None,
            prompt_config: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the legacy system prompt (builder pattern).
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the structured prompt override (builder pattern).
    #[must_use]
    pub fn with_prompt_config(mut self, config: PromptConfig) -> Self {
        self.prompt_config = Some(config);
        self
    }
}
