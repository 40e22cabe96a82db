//! TOML-backed agent catalog.
//!
//! The whole catalog is parsed once at startup and served from memory.
//!
//! ```toml
//! [[tenants]]
//! id = "acme"
//! default_model = "gpt-4o"
//!
//! [[tenants.models]]
//! cite_name = "gpt-4o"
//! model_name = "gpt-4o-2024-08-06"
//! url = "https://api.openai.com/v1"
//!
//! [[tenants.mcp_endpoints]]
//! name = "github"
//! url = "http://mcp-github:8080/sse"
//!
//! [tenants.memory_defaults]
//! memory_switch = true
//!
//! [[tenants.agents]]
//! agent_id = "planner"
//! name = "planner"
//! duty_prompt = "Break the task down."
//! sub_agents = ["researcher"]
//!
//! [[tenants.agents.tools]]
//! name = "web_search"
//! source = "local"
//! ```

use std::collections::HashMap;
use std::path::Path;

use ar_domain::agent::ModelConfig;
use ar_domain::error::{Error, Result};
use ar_memory::MemoryUserConfig;
use async_trait::async_trait;
use serde::Deserialize;

use super::{AgentRecord, AgentStore, McpEndpoint, ToolBinding};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// File format
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tenants: Vec<TenantEntry>,
}

#[derive(Debug, Deserialize)]
struct TenantEntry {
    id: String,
    /// Citation name of the model the legacy aliases point at.
    #[serde(default)]
    default_model: Option<String>,
    #[serde(default)]
    models: Vec<ModelConfig>,
    #[serde(default)]
    mcp_endpoints: Vec<McpEndpoint>,
    #[serde(default)]
    memory_defaults: MemoryUserConfig,
    #[serde(default)]
    users: Vec<UserEntry>,
    #[serde(default)]
    agents: Vec<AgentEntry>,
}

#[derive(Debug, Deserialize)]
struct UserEntry {
    user_id: String,
    #[serde(default)]
    memory: Option<MemoryUserConfig>,
    /// Per-user tool overrides keyed by agent id.
    #[serde(default)]
    tools: HashMap<String, Vec<ToolBinding>>,
}

#[derive(Debug, Deserialize)]
struct AgentEntry {
    #[serde(flatten)]
    record: AgentRecord,
    #[serde(default)]
    sub_agents: Vec<String>,
    #[serde(default)]
    tools: Vec<ToolBinding>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default)]
pub struct CatalogStore {
    tenants: HashMap<String, TenantEntry>,
}

impl CatalogStore {
    /// Load the catalog from disk. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "agent catalog not found, starting empty");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let store = Self::from_toml_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            tenants = store.tenants.len(),
            "agent catalog loaded"
        );
        Ok(store)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: CatalogFile =
            toml::from_str(raw).map_err(|e| Error::Store(format!("catalog parse: {e}")))?;

        let mut tenants = HashMap::with_capacity(file.tenants.len());
        for tenant in file.tenants {
            if tenants.contains_key(&tenant.id) {
                return Err(Error::Store(format!("duplicate tenant id {:?}", tenant.id)));
            }
            tenants.insert(tenant.id.clone(), tenant);
        }
        Ok(Self { tenants })
    }

    fn tenant(&self, tenant_id: &str) -> Result<&TenantEntry> {
        self.tenants
            .get(tenant_id)
            .ok_or_else(|| Error::Store(format!("unknown tenant {tenant_id:?}")))
    }

    fn agent_entry(&self, agent_id: &str, tenant_id: &str) -> Result<&AgentEntry> {
        self.tenant(tenant_id)?
            .agents
            .iter()
            .find(|a| a.record.agent_id == agent_id)
            .ok_or_else(|| Error::AgentNotFound(agent_id.to_owned()))
    }
}

#[async_trait]
impl AgentStore for CatalogStore {
    async fn agent(&self, agent_id: &str, tenant_id: &str) -> Result<AgentRecord> {
        Ok(self.agent_entry(agent_id, tenant_id)?.record.clone())
    }

    async fn sub_agent_ids(&self, agent_id: &str, tenant_id: &str) -> Result<Vec<String>> {
        Ok(self.agent_entry(agent_id, tenant_id)?.sub_agents.clone())
    }

    async fn tool_bindings(
        &self,
        agent_id: &str,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<ToolBinding>> {
        let tenant = self.tenant(tenant_id)?;
        let entry = self.agent_entry(agent_id, tenant_id)?;

        let overrides = tenant
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .and_then(|u| u.tools.get(agent_id));

        // A user override replaces the agent-level binding of the same name.
        let mut bindings = entry.tools.clone();
        if let Some(overrides) = overrides {
            for o in overrides {
                match bindings.iter_mut().find(|b| b.name == o.name) {
                    Some(slot) => *slot = o.clone(),
                    None => bindings.push(o.clone()),
                }
            }
        }
        Ok(bindings)
    }

    async fn models(&self, tenant_id: &str) -> Result<Vec<ModelConfig>> {
        Ok(self.tenant(tenant_id)?.models.clone())
    }

    async fn default_model(&self, tenant_id: &str) -> Result<Option<ModelConfig>> {
        let tenant = self.tenant(tenant_id)?;
        Ok(tenant.default_model.as_deref().and_then(|cite| {
            tenant.models.iter().find(|m| m.cite_name == cite).cloned()
        }))
    }

    async fn mcp_endpoints(&self, tenant_id: &str) -> Result<Vec<McpEndpoint>> {
        Ok(self.tenant(tenant_id)?.mcp_endpoints.clone())
    }

    async fn memory_settings(&self, tenant_id: &str, user_id: &str) -> Result<MemoryUserConfig> {
        let tenant = self.tenant(tenant_id)?;
        Ok(tenant
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .and_then(|u| u.memory.clone())
            .unwrap_or_else(|| tenant.memory_defaults.clone()))
    }
}
