//! The `MemoryStore` trait: interchangeable long-term storage of past
//! assessments. Every backend must gracefully degrade on failure —
//! `retrieve` returns `[]` and `retrieve_by_id` returns `None` rather than
//! propagating a transport error; the Agent treats that as "no memory
//! available" and continues the turn.

use async_trait::async_trait;
use ra_domain::{Memory, Result};
use uuid::Uuid;

#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn store(&self, memory: Memory) -> Result<Uuid>;

    async fn retrieve(&self, query: Option<&str>, feature_id: Option<&str>, limit: usize) -> Vec<Memory>;

    async fn retrieve_by_id(&self, id: Uuid) -> Option<Memory>;

    async fn clear_all(&self) -> Result<()>;
}
