//! A single MCP server connection: handshake, tool discovery, tool calls.
//!
//! The runtime connects once per configured server per Agent session and
//! closes on shutdown (spec §4.8, §5 "Shared resources").

use serde_json::Value;

use crate::protocol::{self, McpToolDef, ToolCallResult, ToolsListResult};
use crate::transport::{McpTransport, SseTransport, StdioTransport, TransportError};
use ra_domain::config::{McpServerConfig, McpTransportKind};

#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("MCP transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("MCP protocol error: {0}")]
    Protocol(String),
    #[error("MCP server is down")]
    ServerDown,
}

impl From<McpError> for ra_domain::Error {
    fn from(e: McpError) -> Self {
        ra_domain::Error::Mcp(e.to_string())
    }
}

pub struct McpClient {
    tools: Vec<McpToolDef>,
    transport: Box<dyn McpTransport>,
}

impl McpClient {
    /// Performs `initialize` → `notifications/initialized` → `tools/list`.
    /// Propagates an error if the server can't be reached at all; a server
    /// that connects but returns no tools is not an error.
    pub async fn connect(config: &McpServerConfig) -> Result<Self, McpError> {
        let transport: Box<dyn McpTransport> = match config.transport {
            McpTransportKind::Stdio => Box::new(StdioTransport::spawn(config)?),
            McpTransportKind::Sse => {
                tracing::warn!("SSE transport is not yet implemented, server will be non-functional");
                Box::new(SseTransport)
            }
        };

        let params = serde_json::to_value(protocol::initialize_params())
            .map_err(|e| McpError::Protocol(format!("failed to serialize initialize params: {e}")))?;
        let resp = transport.send_request("initialize", Some(params)).await?;
        if resp.is_error() {
            return Err(McpError::Protocol(format!("initialize failed: {}", resp.error.unwrap())));
        }

        transport.send_notification("notifications/initialized").await?;

        let tools_resp = transport.send_request("tools/list", None).await?;
        let tools = if tools_resp.is_error() {
            tracing::warn!("tools/list returned error, server will have no tools");
            Vec::new()
        } else {
            let value = tools_resp.result.unwrap_or(Value::Null);
            serde_json::from_value::<ToolsListResult>(value).map(|r| r.tools).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to parse tools/list result");
                Vec::new()
            })
        };

        Ok(Self { tools, transport })
    }

    pub fn tools(&self) -> &[McpToolDef] {
        &self.tools
    }

    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<ToolCallResult, McpError> {
        if !self.transport.is_alive() {
            return Err(McpError::ServerDown);
        }
        let params = serde_json::json!({ "name": tool_name, "arguments": arguments });
        let resp = self.transport.send_request("tools/call", Some(params)).await?;
        if resp.is_error() {
            return Err(McpError::Protocol(format!("tools/call failed: {}", resp.error.unwrap())));
        }
        let value = resp.result.unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| McpError::Protocol(format!("failed to parse tools/call result: {e}")))
    }

    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}
