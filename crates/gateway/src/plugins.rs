//! Plugin tool discovery.
//!
//! Plugins are described by one JSON manifest per tool in the configured
//! directory. A manifest that fails to parse is skipped with a warning;
//! the rest of the scan still succeeds.

use std::path::{Path, PathBuf};

use ar_domain::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A discovered plugin tool, attached verbatim as tool metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub inputs: serde_json::Value,
    #[serde(default)]
    pub output_type: Option<String>,
    /// Anything else the manifest carries.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
pub trait PluginScanner: Send + Sync {
    async fn scan(&self) -> Result<Vec<PluginTool>>;
}

pub struct DirectoryPluginScanner {
    dir: PathBuf,
}

impl DirectoryPluginScanner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl PluginScanner for DirectoryPluginScanner {
    async fn scan(&self) -> Result<Vec<PluginTool>> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || scan_dir(&dir))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
    }
}

fn scan_dir(dir: &Path) -> Result<Vec<PluginTool>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| Error::Plugin(format!("reading {}: {e}", dir.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut tools = Vec::with_capacity(paths.len());
    for path in paths {
        match read_manifest(&path) {
            Ok(tool) => tools.push(tool),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping plugin manifest");
            }
        }
    }
    Ok(tools)
}

fn read_manifest(path: &Path) -> Result<PluginTool> {
    let raw = std::fs::read_to_string(path)?;
    let tool: PluginTool = serde_json::from_str(&raw)?;
    if tool.name.trim().is_empty() {
        return Err(Error::Plugin("manifest has an empty name".into()));
    }
    Ok(tool)
}
