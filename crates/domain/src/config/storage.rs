use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local storage paths
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Agent/tool/model catalog (TOML).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "d_catalog")]
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { path: d_catalog() }
    }
}

/// Directory scanned for plugin tool manifests (`*.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    #[serde(default = "d_plugins")]
    pub path: PathBuf,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self { path: d_plugins() }
    }
}

/// Directory holding one JSONL file per conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationsConfig {
    #[serde(default = "d_conversations")]
    pub path: PathBuf,
}

impl Default for ConversationsConfig {
    fn default() -> Self {
        Self {
            path: d_conversations(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prompt identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Values bound into every rendered system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "d_app_name")]
    pub app_name: String,
    #[serde(default = "d_app_description")]
    pub app_description: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            app_name: d_app_name(),
            app_description: d_app_description(),
        }
    }
}

fn d_catalog() -> PathBuf {
    PathBuf::from("./data/catalog.toml")
}
fn d_plugins() -> PathBuf {
    PathBuf::from("./data/plugins")
}
fn d_conversations() -> PathBuf {
    PathBuf::from("./data/conversations")
}
fn d_app_name() -> String {
    "AgentRelay".into()
}
fn d_app_description() -> String {
    "A multi-agent assistant".into()
}
