//! AppState construction extracted from `main.rs`.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use ar_domain::config::{Config, ConfigSeverity};
use ar_memory::create_provider as create_memory_provider;

use crate::conversation::JsonlConversationStore;
use crate::engine::HttpEngine;
use crate::knowledge::RestKnowledgeBase;
use crate::plugins::DirectoryPluginScanner;
use crate::runtime::background::BackgroundTasks;
use crate::runtime::cancel::{InMemoryPreprocessRegistry, InMemoryRunRegistry};
use crate::runtime::Runtime;
use crate::state::AppState;
use crate::store::CatalogStore;

/// Validate config, initialize every collaborator and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Agent catalog ────────────────────────────────────────────────
    let store = Arc::new(
        CatalogStore::load(&config.catalog.path).context("loading agent catalog")?,
    );

    // ── Memory client ────────────────────────────────────────────────
    let memory = create_memory_provider(&config.memory).context("creating memory client")?;

    // ── Knowledge base ───────────────────────────────────────────────
    let knowledge = Arc::new(
        RestKnowledgeBase::new(&config.knowledge).context("creating knowledge-base client")?,
    );
    tracing::info!(url = %config.knowledge.base_url, "knowledge-base client ready");

    // ── Plugins ──────────────────────────────────────────────────────
    let plugins = Arc::new(DirectoryPluginScanner::new(config.plugins.path.clone()));
    tracing::info!(path = %config.plugins.path.display(), "plugin scanner ready");

    // ── Execution engine ─────────────────────────────────────────────
    let engine = Arc::new(HttpEngine::new(&config.engine).context("creating engine client")?);
    tracing::info!(url = %config.engine.base_url, "execution engine client ready");

    // ── Conversations ────────────────────────────────────────────────
    let conversations = Arc::new(
        JsonlConversationStore::new(&config.conversations.path)
            .context("initializing conversation store")?,
    );
    tracing::info!(path = %config.conversations.path.display(), "conversation store ready");

    // ── API token (read once, hash for constant-time comparison) ────
    let api_token_hash = {
        let env_var = &config.server.api_token_env;
        match std::env::var(env_var).ok().filter(|t| !t.is_empty()) {
            Some(t) => {
                tracing::info!(source = %format!("env:{env_var}"), "API bearer-token auth enabled");
                Some(Sha256::digest(t.as_bytes()).to_vec())
            }
            None => {
                tracing::warn!("API bearer-token auth DISABLED, set the {env_var} env var");
                None
            }
        }
    };

    let runtime = Runtime {
        config: config.clone(),
        store,
        memory,
        knowledge,
        plugins,
        engine,
        conversations,
        runs: Arc::new(InMemoryRunRegistry::new()),
        preprocess: Arc::new(InMemoryPreprocessRegistry::new()),
        background: BackgroundTasks::new(),
    };

    Ok(AppState {
        config,
        runtime,
        api_token_hash,
    })
}
