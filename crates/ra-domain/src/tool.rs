use serde::{Deserialize, Serialize};

/// A tool offered to the provider. Registered once at agent startup and
/// never unregistered during a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Emitted by the Provider when the assistant wants to invoke a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Extra bookkeeping attached to a tool result when it passed through the
/// Sub-Conversation Manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subconversation_id: Option<uuid::Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    pub duration_ms: u64,
}

/// Produced by the Tool Registry, consumed by the next provider turn.
/// Exactly one per [`ToolCall`]; ordering matches call order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: String,
    pub success: bool,
    pub metadata: ToolResultMetadata,
}

impl ToolResult {
    pub fn ok(tool_call_id: impl Into<String>, content: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            success: true,
            metadata: ToolResultMetadata {
                duration_ms,
                ..Default::default()
            },
        }
    }

    pub fn failed(tool_call_id: impl Into<String>, message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: message.into(),
            success: false,
            metadata: ToolResultMetadata {
                duration_ms,
                ..Default::default()
            },
        }
    }
}
