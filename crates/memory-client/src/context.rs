//! Per-user memory settings and the level policy derived from them.

use ar_domain::config::{MemoryBackendConfig, MemoryServiceConfig};
use serde::{Deserialize, Serialize};

use crate::types::{MemoryAddRequest, MemoryLevel, MemoryMessage, MemorySearchRequest};

/// Whether memories learned by one user of an agent are shared with the
/// agent's other users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySharing {
    #[default]
    Always,
    Ask,
    /// Disables the `agent` level for every agent.
    Never,
}

/// A user's memory settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUserConfig {
    /// Master switch; off means no retrieval and no write-back.
    #[serde(default)]
    pub memory_switch: bool,
    #[serde(default)]
    pub agent_share: MemorySharing,
    /// Agents whose shared (`agent` level) memory is disabled.
    #[serde(default)]
    pub disabled_agent_ids: Vec<String>,
    /// Agents whose private (`user_agent` level) memory is disabled.
    #[serde(default)]
    pub disabled_user_agent_ids: Vec<String>,
}

/// Everything a memory call needs: settings, backend config and identity.
#[derive(Debug, Clone)]
pub struct MemoryContext {
    pub user_config: MemoryUserConfig,
    pub backend: MemoryBackendConfig,
    pub top_k: u32,
    pub threshold: f64,
    pub tenant_id: String,
    pub user_id: String,
    pub agent_id: String,
}

impl MemoryContext {
    pub fn new(
        user_config: MemoryUserConfig,
        service: &MemoryServiceConfig,
        tenant_id: &str,
        user_id: &str,
        agent_id: &str,
    ) -> Self {
        Self {
            user_config,
            backend: service.backend.clone(),
            top_k: service.top_k,
            threshold: service.threshold,
            tenant_id: tenant_id.to_owned(),
            user_id: user_id.to_owned(),
            agent_id: agent_id.to_owned(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.user_config.memory_switch
    }

    fn agent_level_disabled(&self, agent_id: &str) -> bool {
        self.user_config.agent_share == MemorySharing::Never
            || self.user_config.disabled_agent_ids.iter().any(|a| a == agent_id)
    }

    fn user_agent_level_disabled(&self, agent_id: &str) -> bool {
        self.user_config
            .disabled_user_agent_ids
            .iter()
            .any(|a| a == agent_id)
    }

    /// Levels a search for `agent_id` may read from.
    pub fn search_levels(&self, agent_id: &str) -> Vec<MemoryLevel> {
        MemoryLevel::ALL
            .into_iter()
            .filter(|level| match level {
                MemoryLevel::Tenant | MemoryLevel::User => true,
                MemoryLevel::Agent => !self.agent_level_disabled(agent_id),
                MemoryLevel::UserAgent => !self.user_agent_level_disabled(agent_id),
            })
            .collect()
    }

    /// Levels a finished run of `agent_id` may write back to.
    pub fn write_levels(&self, agent_id: &str) -> Vec<MemoryLevel> {
        [MemoryLevel::Agent, MemoryLevel::UserAgent]
            .into_iter()
            .filter(|level| match level {
                MemoryLevel::Agent => !self.agent_level_disabled(agent_id),
                MemoryLevel::UserAgent => !self.user_agent_level_disabled(agent_id),
                MemoryLevel::Tenant | MemoryLevel::User => false,
            })
            .collect()
    }

    pub fn search_request(
        &self,
        query: &str,
        agent_id: &str,
        memory_levels: Vec<MemoryLevel>,
    ) -> MemorySearchRequest {
        MemorySearchRequest {
            query: query.to_owned(),
            tenant_id: self.tenant_id.clone(),
            user_id: self.user_id.clone(),
            agent_id: agent_id.to_owned(),
            memory_levels,
            top_k: self.top_k,
            threshold: self.threshold,
            config: self.backend.clone(),
        }
    }

    pub fn add_request(
        &self,
        messages: Vec<MemoryMessage>,
        memory_levels: Vec<MemoryLevel>,
    ) -> MemoryAddRequest {
        MemoryAddRequest {
            messages,
            tenant_id: self.tenant_id.clone(),
            user_id: self.user_id.clone(),
            agent_id: self.agent_id.clone(),
            memory_levels,
            infer: true,
            config: self.backend.clone(),
        }
    }
}
