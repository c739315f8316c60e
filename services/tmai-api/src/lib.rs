//! TMAI API service: HTTP gateway over the key store, quota enforcer,
//! ingestion pipeline, retriever, and chat orchestrator.

pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod handlers;
pub mod rest;
pub mod session;
pub mod state;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tracing::{debug, info, warn};

use tmai_core::UsageCounterStore;
use tmai_embedding::{
    EmbeddingProvider, MockEmbeddingProvider, RemoteEmbeddingConfig, RemoteEmbeddingProvider,
};
use tmai_llm::{ChatModel, MockChatModel, RemoteChatConfig, RemoteChatModel};
use tmai_metadata::{
    create_sqlite_pool, run_migrations, SqliteApiKeyRepository, SqliteDocumentRepository,
    SqliteServiceCatalog, SqliteUsageCounterStore,
};

use crate::config::TmaiConfig;
use crate::rest::build_router;
use crate::session::StaticSessionVerifier;
use crate::state::{AppState, RuntimeSettings};

/// Interval between usage-window garbage collection sweeps.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Loads configuration, wires collaborators, and serves until shutdown.
pub async fn run_server() -> anyhow::Result<()> {
    let config = TmaiConfig::load().context("failed to load configuration")?;

    let pool = create_sqlite_pool(&config.database.url)
        .await
        .context("failed to open metadata database")?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let counters: Arc<dyn UsageCounterStore> = Arc::new(SqliteUsageCounterStore::new(pool.clone()));
    let state = AppState {
        services: Arc::new(SqliteServiceCatalog::new(pool.clone())),
        api_keys: Arc::new(SqliteApiKeyRepository::new(pool.clone())),
        counters: counters.clone(),
        documents: Arc::new(SqliteDocumentRepository::new(pool)),
        embedder: build_embedder(&config)?,
        generator: build_generator(&config)?,
        sessions: Arc::new(StaticSessionVerifier::from_config(&config.sessions.tokens)?),
        settings: Arc::new(RuntimeSettings::from_config(&config)),
    };

    spawn_purge_task(counters);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "TMAI gateway listening");

    axum::serve(listener, build_router(state))
        .await
        .context("server terminated")?;

    Ok(())
}

fn build_embedder(config: &TmaiConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let embedding = &config.embedding;
    Ok(match embedding.provider.as_str() {
        "remote" => Arc::new(
            RemoteEmbeddingProvider::new(RemoteEmbeddingConfig {
                base_url: embedding.base_url.clone(),
                api_key: embedding.api_key.clone(),
                model: embedding.model.clone(),
                dimension: embedding.dimension,
                timeout: Duration::from_secs(embedding.timeout_secs),
            })
            .context("failed to build embedding provider")?,
        ),
        _ => Arc::new(MockEmbeddingProvider::with_dimension(embedding.dimension)),
    })
}

fn build_generator(config: &TmaiConfig) -> anyhow::Result<Arc<dyn ChatModel>> {
    let generation = &config.generation;
    Ok(match generation.provider.as_str() {
        "remote" => Arc::new(
            RemoteChatModel::new(RemoteChatConfig {
                base_url: generation.base_url.clone(),
                api_key: generation.api_key.clone(),
                timeout: Duration::from_secs(generation.timeout_secs),
            })
            .context("failed to build generation provider")?,
        ),
        _ => Arc::new(MockChatModel::new()),
    })
}

/// Reclaims expired usage-window rows on a fixed cadence. Correctness
/// never depends on this; rows expire two windows past their start.
fn spawn_purge_task(counters: Arc<dyn UsageCounterStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match counters.purge_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "purged expired usage windows"),
                Err(err) => warn!(error = %err, "usage window purge failed"),
            }
        }
    });
}
