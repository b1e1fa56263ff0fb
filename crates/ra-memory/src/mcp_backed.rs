//! Vector- and graph-backed [`MemoryStore`] implementations, both speaking
//! to their backend exclusively through an MCP server's tool-call
//! interface (no backend-specific wire protocol lives in this crate).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ra_domain::{Decision, Error, Memory, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::store::MemoryStore;

/// Narrow seam over [`ra_mcp::McpClient`] so these stores can be tested
/// without a real child process.
#[async_trait]
pub trait McpToolCaller: Send + Sync {
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value>;
}

#[async_trait]
impl McpToolCaller for ra_mcp::McpClient {
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        let result = self.call_tool(name, arguments).await.map_err(Error::from)?;
        if result.is_error {
            return Err(Error::MemoryUnavailable(result.text()));
        }
        serde_json::from_str(&result.text()).or_else(|_| Ok(Value::String(result.text())))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Vector,
    Graph,
}

/// MCP-backed `MemoryStore`. `Backend::Vector` calls a semantic similarity
/// tool; `Backend::Graph` calls a hybrid graph+semantic episodes tool.
/// Both degrade to empty results on any transport failure, per spec §4.8.
pub struct McpMemoryStore {
    client: Arc<dyn McpToolCaller>,
    backend: Backend,
}

impl McpMemoryStore {
    pub fn new(client: Arc<dyn McpToolCaller>, backend: Backend) -> Self {
        Self { client, backend }
    }

    fn store_tool(&self) -> &'static str {
        match self.backend {
            Backend::Vector => "store_memory",
            Backend::Graph => "add_episode",
        }
    }

    fn search_tool(&self) -> &'static str {
        match self.backend {
            Backend::Vector => "query_memories",
            Backend::Graph => "search_episodes",
        }
    }
}

#[async_trait]
impl MemoryStore for McpMemoryStore {
    async fn store(&self, memory: Memory) -> Result<Uuid> {
        let id = memory.id;
        let args = serde_json::json!({
            "id": id.to_string(),
            "feature_id": memory.feature_id,
            "decision": memory.decision.as_str(),
            "justification": memory.justification,
            "key_findings": memory.key_findings,
            "timestamp": memory.timestamp.to_rfc3339(),
            "searchable_text": memory.searchable_text(),
        });
        self.client.call_tool(self.store_tool(), args).await?;
        Ok(id)
    }

    async fn retrieve(&self, query: Option<&str>, feature_id: Option<&str>, limit: usize) -> Vec<Memory> {
        let args = serde_json::json!({
            "query": query.unwrap_or_default(),
            "filter": feature_id.map(|f| serde_json::json!({ "feature_id": f })),
            "limit": limit,
        });
        match self.client.call_tool(self.search_tool(), args).await {
            Ok(value) => parse_memories(&value),
            Err(err) => {
                tracing::warn!(error = %err, backend = self.search_tool(), "mcp memory retrieve failed, continuing without memory");
                Vec::new()
            }
        }
    }

    async fn retrieve_by_id(&self, id: Uuid) -> Option<Memory> {
        let args = serde_json::json!({ "id": id.to_string() });
        let value = self.client.call_tool("get_memory", args).await.ok()?;
        memory_from_episode(&value)
    }

    async fn clear_all(&self) -> Result<()> {
        self.client.call_tool("clear_memories", serde_json::json!({})).await.map(|_| ())
    }
}

fn parse_memories(value: &Value) -> Vec<Memory> {
    let episodes = value.get("episodes").or_else(|| value.get("results")).unwrap_or(value);
    episodes
        .as_array()
        .map(|arr| arr.iter().filter_map(memory_from_episode).collect())
        .unwrap_or_default()
}

fn memory_from_episode(value: &Value) -> Option<Memory> {
    let id = value.get("id")?.as_str().and_then(|s| Uuid::parse_str(s).ok())?;
    let feature_id = value.get("feature_id")?.as_str()?.to_string();
    let decision = Decision::parse_case_insensitive(value.get("decision")?.as_str()?)?;
    let justification = value.get("justification").and_then(Value::as_str).unwrap_or_default().to_string();
    let key_findings = value
        .get("key_findings")
        .and_then(Value::as_object)
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<BTreeMap<_, _>>())
        .unwrap_or_default();
    let timestamp = value
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Some(Memory { id, feature_id, decision, justification, key_findings, timestamp, metadata: BTreeMap::new() })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockCaller {
        response: Value,
    }

    #[async_trait]
    impl McpToolCaller for MockCaller {
        async fn call_tool(&self, _name: &str, _arguments: Value) -> Result<Value> {
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn retrieve_parses_episodes_array() {
        let caller = MockCaller {
            response: serde_json::json!({
                "episodes": [{
                    "id": Uuid::new_v4().to_string(),
                    "feature_id": "FEAT-1",
                    "decision": "ready",
                    "justification": "all green",
                    "key_findings": {},
                    "timestamp": Utc::now().to_rfc3339(),
                }]
            }),
        };
        let store = McpMemoryStore::new(Arc::new(caller), Backend::Graph);
        let results = store.retrieve(Some("FEAT-1"), None, 5).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].feature_id, "FEAT-1");
    }

    struct FailingCaller;

    #[async_trait]
    impl McpToolCaller for FailingCaller {
        async fn call_tool(&self, _name: &str, _arguments: Value) -> Result<Value> {
            Err(Error::MemoryUnavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn retrieve_degrades_to_empty_on_transport_failure() {
        let store = McpMemoryStore::new(Arc::new(FailingCaller), Backend::Vector);
        assert!(store.retrieve(None, None, 5).await.is_empty());
    }
}
