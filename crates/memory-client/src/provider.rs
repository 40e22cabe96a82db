//! The `MemoryProvider` trait defines the interface for all memory service
//! backends (REST, test doubles).

use async_trait::async_trait;
use ar_domain::error::Result;

use crate::types::{MemoryAddRequest, MemoryAddResponse, MemorySearchRequest, MemorySearchResponse};

/// Abstraction over the memory service.
///
/// Both calls are fallible; callers decide whether a failure is fatal
/// (retrieval during run preparation) or only logged (write-back after a
/// run).
#[async_trait]
pub trait MemoryProvider: Send + Sync {
    /// Semantic search across the requested levels (POST /memory/search).
    async fn search(&self, req: MemorySearchRequest) -> Result<MemorySearchResponse>;

    /// Extract and store memories from a message exchange (POST /memory/add).
    async fn add(&self, req: MemoryAddRequest) -> Result<MemoryAddResponse>;
}
