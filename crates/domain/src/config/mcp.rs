//! MCP endpoint configuration.
//!
//! Tenants register their own remote endpoints in the catalog; the one
//! configured here is the gateway-local endpoint every tenant can reach.
//! The MCP wire protocol itself belongs to the execution engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Name tools use (as their `usage` key) to reference the local endpoint.
    #[serde(default = "d_local_name")]
    pub local_endpoint_name: String,
    /// URL of the local endpoint.
    #[serde(default = "d_local_url")]
    pub local_endpoint_url: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            local_endpoint_name: d_local_name(),
            local_endpoint_url: d_local_url(),
        }
    }
}

fn d_local_name() -> String {
    "local".into()
}
fn d_local_url() -> String {
    "http://127.0.0.1:5011/sse".into()
}
