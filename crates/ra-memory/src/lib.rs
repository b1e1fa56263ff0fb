//! Interchangeable long-term storage of past assessments: file, vector, or
//! graph back-ends behind one [`MemoryStore`] contract.

mod file;
mod mcp_backed;
mod store;

pub use file::FileMemoryStore;
pub use mcp_backed::{Backend, McpMemoryStore, McpToolCaller};
pub use store::MemoryStore;

use async_trait::async_trait;
use ra_domain::config::{MemoryBackend, MemoryConfig};
use ra_domain::{Memory, Result};
use std::sync::Arc;
use uuid::Uuid;

/// A no-op backend for `MemoryBackend::None`: every assessment is scored
/// without cross-conversation recall.
pub struct NoneMemoryStore;

#[async_trait]
impl MemoryStore for NoneMemoryStore {
    async fn store(&self, memory: Memory) -> Result<Uuid> {
        Ok(memory.id)
    }

    async fn retrieve(&self, _query: Option<&str>, _feature_id: Option<&str>, _limit: usize) -> Vec<Memory> {
        Vec::new()
    }

    async fn retrieve_by_id(&self, _id: Uuid) -> Option<Memory> {
        None
    }

    async fn clear_all(&self) -> Result<()> {
        Ok(())
    }
}

/// Builds the configured `MemoryStore`. MCP-backed variants connect to
/// their server once; a connection failure falls back to [`NoneMemoryStore`]
/// with a warning rather than failing agent startup.
pub async fn create_memory_store(config: &MemoryConfig, memory_dir: impl Into<std::path::PathBuf>) -> Arc<dyn MemoryStore> {
    match config.backend {
        MemoryBackend::None => Arc::new(NoneMemoryStore),
        MemoryBackend::File => match FileMemoryStore::new(memory_dir) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                tracing::warn!(error = %err, "failed to initialize file memory store, falling back to none");
                Arc::new(NoneMemoryStore)
            }
        },
        MemoryBackend::Chroma | MemoryBackend::Graphiti => {
            if !config.mcp_enabled {
                tracing::warn!("memory backend requires MCP but MCP_ENABLED is false, falling back to none");
                return Arc::new(NoneMemoryStore);
            }
            match ra_mcp::McpClient::connect(&config.server).await {
                Ok(client) => {
                    let backend = if config.backend == MemoryBackend::Chroma { Backend::Vector } else { Backend::Graph };
                    Arc::new(McpMemoryStore::new(Arc::new(client), backend))
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to connect to memory MCP server, falling back to none");
                    Arc::new(NoneMemoryStore)
                }
            }
        }
    }
}
