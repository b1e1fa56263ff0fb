//! Minimal MCP (Model Context Protocol) client: JSON-RPC 2.0 types, a
//! stdio transport, and a single-server connection used by MCP-backed
//! Memory Store variants and (optionally) by the Tool Registry to expose
//! MCP tools under a `mcp:<server>:` prefix.

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::{McpClient, McpError};
pub use protocol::McpToolDef;
