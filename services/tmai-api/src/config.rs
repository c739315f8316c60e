//! Configuration management for the TMAI API service.
//!
//! Sources, in precedence order: environment variables (`TMAI__`-prefixed),
//! a config file named by `TMAI_CONFIG`, `./config/tmai.yaml`,
//! `/etc/tmai/tmai.yaml`, then hardcoded defaults.

use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use tmai_core::KeyLimits;

/// Root configuration structure for the TMAI API service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TmaiConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub keys: KeysConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,
}

/// Metadata database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite://tmai.db`.
    pub url: String,
}

/// Server-controlled defaults applied to newly issued keys.
/// Zero means unlimited along that axis, as with tenant quotas.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeysConfig {
    /// Default per-minute request limit for new keys.
    pub default_rate_limit_per_minute: u32,
    /// Default per-month request limit for new keys.
    pub default_monthly_request_limit: u32,
}

impl KeysConfig {
    /// Converts the configured defaults into issuance limits.
    #[must_use]
    pub fn limits(&self) -> KeyLimits {
        fn nonzero(value: u32) -> Option<u32> {
            (value > 0).then_some(value)
        }
        KeyLimits {
            per_minute: nonzero(self.default_rate_limit_per_minute),
            per_month: nonzero(self.default_monthly_request_limit),
        }
    }
}

/// Ingestion pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Maximum characters per chunk produced by the splitter.
    pub max_chunk_chars: usize,
}

/// Retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Ranked chunks returned per query.
    pub top_k: usize,
    /// Candidates considered before truncating to `top_k`.
    pub candidate_pool: usize,
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// `mock` or `remote`.
    pub provider: String,
    /// Base URL for the remote provider.
    pub base_url: String,
    /// Bearer token for the remote provider.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Fixed output dimension.
    pub dimension: u32,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

/// Generation provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// `mock` or `remote`.
    pub provider: String,
    /// Base URL for the remote provider.
    pub base_url: String,
    /// Bearer token for the remote provider.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

/// First-party session tokens accepted by the service.
///
/// Session auth proper is an external collaborator; this static map is
/// the boundary configuration for it.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SessionsConfig {
    /// Map of session token to owning tenant UUID.
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://tmai.db".to_string(),
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            default_rate_limit_per_minute: KeyLimits::DEFAULT_PER_MINUTE,
            default_monthly_request_limit: KeyLimits::DEFAULT_PER_MONTH,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 1200,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            candidate_pool: 50,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            base_url: String::new(),
            api_key: None,
            model: "mock-embed-64".to_string(),
            dimension: 64,
            timeout_secs: 30,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            base_url: String::new(),
            api_key: None,
            model: "mock-chat".to_string(),
            timeout_secs: 60,
        }
    }
}

impl TmaiConfig {
    /// Load configuration from all sources with the documented precedence.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Ok(config_path) = std::env::var("TMAI_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/tmai").required(false))
            .add_source(File::with_name("/etc/tmai/tmai").required(false));

        // Override with environment variables.
        // Example: TMAI__KEYS__DEFAULT_RATE_LIMIT_PER_MINUTE=120
        builder = builder.add_source(
            Environment::with_prefix("TMAI")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants that defaults alone cannot
    /// guarantee once overridden.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(message: &str) -> ConfigError {
            ConfigError::Message(message.to_string())
        }

        if self.ingest.max_chunk_chars == 0 {
            return Err(invalid("ingest.max_chunk_chars must be at least 1"));
        }
        if self.retrieval.top_k == 0 {
            return Err(invalid("retrieval.top_k must be at least 1"));
        }
        if self.retrieval.candidate_pool < self.retrieval.top_k {
            return Err(invalid("retrieval.candidate_pool must be >= retrieval.top_k"));
        }
        if self.embedding.dimension == 0 {
            return Err(invalid("embedding.dimension must be at least 1"));
        }
        for (section, provider, base_url) in [
            ("embedding", &self.embedding.provider, &self.embedding.base_url),
            ("generation", &self.generation.provider, &self.generation.base_url),
        ] {
            match provider.as_str() {
                "mock" => {}
                "remote" => {
                    if base_url.is_empty() {
                        return Err(invalid(&format!(
                            "{section}.base_url is required for the remote provider"
                        )));
                    }
                }
                other => {
                    return Err(invalid(&format!(
                        "{section}.provider must be `mock` or `remote`, got `{other}`"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = TmaiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.keys.limits(), KeyLimits::standard());
    }

    #[test]
    fn zero_key_defaults_mean_unlimited() {
        let keys = KeysConfig {
            default_rate_limit_per_minute: 0,
            default_monthly_request_limit: 0,
        };
        assert_eq!(keys.limits(), KeyLimits::unlimited());
    }

    #[test]
    fn remote_provider_requires_a_base_url() {
        let mut config = TmaiConfig::default();
        config.embedding.provider = "remote".to_string();
        assert!(config.validate().is_err());

        config.embedding.base_url = "https://api.example.com/v1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = TmaiConfig::default();
        config.generation.provider = "carrier-pigeon".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn candidate_pool_smaller_than_top_k_is_rejected() {
        let mut config = TmaiConfig::default();
        config.retrieval.top_k = 10;
        config.retrieval.candidate_pool = 5;
        assert!(config.validate().is_err());
    }
}
