use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A typed fragment of a [`Message`]'s content.
///
/// `tool_use.id` must be unique within a conversation; every `tool_result`
/// refers to a preceding `tool_use.id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        output: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single turn's content. Never empty: a [`Message`] always carries at
/// least one content block, even if it is a single empty text block for a
/// blank system prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentBlock::text(text)])
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentBlock::text(text)])
    }

    /// Joins every `Text` block's contents with `\n`. Tool blocks are skipped.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_use_blocks(&self) -> impl Iterator<Item = (&str, &str, &serde_json::Value)> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolUse { id, name, input } => Some((id.as_str(), name.as_str(), input)),
            _ => None,
        })
    }

    pub fn tool_result_ids(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_content_joins_multiple_blocks() {
        let msg = Message::new(
            Role::Assistant,
            vec![
                ContentBlock::text("line one"),
                ContentBlock::ToolUse {
                    id: "t1".into(),
                    name: "get_jira_data".into(),
                    input: serde_json::json!({}),
                },
                ContentBlock::text("line two"),
            ],
        );
        assert_eq!(msg.text_content(), "line one\nline two");
    }

    #[test]
    fn tool_use_blocks_iterates_only_tool_use() {
        let msg = Message::assistant(vec![
            ContentBlock::text("thinking"),
            ContentBlock::ToolUse {
                id: "t1".into(),
                name: "get_jira_data".into(),
                input: serde_json::json!({"id": "FEAT-1"}),
            },
        ]);
        let calls: Vec<_> = msg.tool_use_blocks().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "get_jira_data");
    }
}
