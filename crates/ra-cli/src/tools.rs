//! Demo tool set for the release-readiness domain: Jira ticket state, CI
//! analysis results, and architecture-doc lookups. Every tool reads from a
//! flat fixture tree so the CLI runs end to end without a live Jira/CI
//! integration; swapping in real integrations means replacing these
//! handlers, not the registry or the Agent Core.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use ra_domain::Result;
use ra_tools::{ToolHandler, ToolRegistry};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(std::env::var("FIXTURES_DIR").unwrap_or_else(|_| "./data/fixtures".to_string()))
}

struct JiraDataTool {
    dir: PathBuf,
}

#[async_trait]
impl ToolHandler for JiraDataTool {
    async fn call(&self, input: serde_json::Value) -> std::result::Result<serde_json::Value, String> {
        let feature_id = input.get("feature_id").and_then(|v| v.as_str()).ok_or("missing required field: feature_id")?;
        let path = self.dir.join("jira").join(format!("{feature_id}.json"));
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| format!("no jira ticket for {feature_id}: {e}"))?;
        serde_json::from_str(&raw).map_err(|e| format!("malformed jira fixture for {feature_id}: {e}"))
    }
}

struct AnalysisTool {
    dir: PathBuf,
}

#[async_trait]
impl ToolHandler for AnalysisTool {
    async fn call(&self, input: serde_json::Value) -> std::result::Result<serde_json::Value, String> {
        let feature_id = input.get("feature_id").and_then(|v| v.as_str()).ok_or("missing required field: feature_id")?;
        let path = self.dir.join("analysis").join(format!("{feature_id}.json"));
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| format!("no analysis for {feature_id}: {e}"))?;
        serde_json::from_str(&raw).map_err(|e| format!("malformed analysis fixture for {feature_id}: {e}"))
    }
}

struct ListDocsTool {
    dir: PathBuf,
}

#[async_trait]
impl ToolHandler for ListDocsTool {
    async fn call(&self, _input: serde_json::Value) -> std::result::Result<serde_json::Value, String> {
        let docs_dir = self.dir.join("docs");
        let mut entries = tokio::fs::read_dir(&docs_dir).await.map_err(|e| format!("reading docs directory: {e}"))?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| e.to_string())? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(serde_json::json!({ "docs": names }))
    }
}

struct ReadDocTool {
    dir: PathBuf,
}

#[async_trait]
impl ToolHandler for ReadDocTool {
    async fn call(&self, input: serde_json::Value) -> std::result::Result<serde_json::Value, String> {
        let name = input.get("name").and_then(|v| v.as_str()).ok_or("missing required field: name")?;
        let path = self.dir.join("docs").join(name);
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| format!("reading doc {name}: {e}"))?;
        Ok(serde_json::Value::String(contents))
    }
}

pub fn register_builtin_tools(registry: &ToolRegistry) -> Result<()> {
    let dir = fixtures_dir();

    registry.register(
        "get_jira_data",
        "Fetch the Jira ticket state for a feature id, including status and linked sub-tasks.",
        serde_json::json!({
            "type": "object",
            "properties": { "feature_id": { "type": "string" } },
            "required": ["feature_id"]
        }),
        Arc::new(JiraDataTool { dir: dir.clone() }),
    )?;

    registry.register(
        "get_analysis",
        "Fetch CI test results and static analysis findings for a feature id.",
        serde_json::json!({
            "type": "object",
            "properties": { "feature_id": { "type": "string" } },
            "required": ["feature_id"]
        }),
        Arc::new(AnalysisTool { dir: dir.clone() }),
    )?;

    registry.register(
        "list_docs",
        "List the architecture and design documents available for review.",
        serde_json::json!({ "type": "object", "properties": {} }),
        Arc::new(ListDocsTool { dir: dir.clone() }),
    )?;

    registry.register(
        "read_doc",
        "Read the full contents of a named document returned by list_docs.",
        serde_json::json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        }),
        Arc::new(ReadDocTool { dir }),
    )?;

    Ok(())
}
