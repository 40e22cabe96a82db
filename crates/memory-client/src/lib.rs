//! `ar-memory`: conversational memory client for AgentRelay.
//!
//! Provides the [`MemoryProvider`] trait that abstracts over the memory
//! service, a REST implementation ([`RestMemoryClient`]), the wire DTOs,
//! and [`MemoryContext`], which decides which memory levels a run may read
//! from and write back to.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ar_domain::config::MemoryServiceConfig;
//! use ar_memory::{MemoryLevel, MemoryProvider, MemorySearchRequest, RestMemoryClient};
//!
//! # async fn example() -> ar_domain::error::Result<()> {
//! let cfg = MemoryServiceConfig::default();
//! let client = RestMemoryClient::new(&cfg)?;
//!
//! let found = client
//!     .search(MemorySearchRequest {
//!         query: "preferred report format".into(),
//!         tenant_id: "acme".into(),
//!         user_id: "u1".into(),
//!         agent_id: "writer".into(),
//!         memory_levels: vec![MemoryLevel::User, MemoryLevel::UserAgent],
//!         top_k: cfg.top_k,
//!         threshold: cfg.threshold,
//!         config: cfg.backend.clone(),
//!     })
//!     .await?;
//!
//! println!("found {} memories", found.results.len());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod provider;
pub mod rest;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use context::{MemoryContext, MemorySharing, MemoryUserConfig};
pub use provider::MemoryProvider;
pub use rest::{from_reqwest, RestMemoryClient};
pub use types::{
    MemoryAddRequest, MemoryAddResponse, MemoryEvent, MemoryLevel, MemoryMessage, MemoryRecord,
    MemorySearchRequest, MemorySearchResponse,
};

use std::sync::Arc;

use ar_domain::config::MemoryServiceConfig;
use ar_domain::error::Result;

/// Create the [`MemoryProvider`] the gateway uses.
pub fn create_provider(cfg: &MemoryServiceConfig) -> Result<Arc<dyn MemoryProvider>> {
    let client = RestMemoryClient::new(cfg)?;
    tracing::info!(
        url = %cfg.base_url,
        top_k = cfg.top_k,
        threshold = cfg.threshold,
        "memory client ready"
    );
    Ok(Arc::new(client))
}
