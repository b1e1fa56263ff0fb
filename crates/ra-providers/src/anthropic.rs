//! Anthropic Messages API adapter, non-streaming: the runtime never streams
//! model output to the user, so only the single-shot `/v1/messages` call is
//! implemented.

use crate::traits::{LlmProvider, ProviderResponse, Usage};
use crate::util::{from_reqwest, resolve_api_key, status_to_error};
use async_trait::async_trait;
use ra_domain::{ContentBlock, Message, Result, Role, ToolDefinition};
use serde_json::Value;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Single-attempt Anthropic Messages API adapter. Retries are the caller's
/// responsibility (the Agent and Sub-Conversation Manager both wrap calls
/// in `ra_retry::with_retry`) so a single `RetryConfig` governs the whole
/// turn instead of compounding with a per-provider retry loop.
pub struct AnthropicProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, api_key_env: &str, default_model: impl Into<String>) -> Result<Self> {
        let api_key = resolve_api_key(api_key_env)?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            id: id.into(),
            base_url: base_url.into(),
            api_key,
            default_model: default_model.into(),
            client,
        })
    }

    fn build_body(&self, messages: &[Message], max_tokens: u32, system: Option<&str>, tools: &[ToolDefinition]) -> Value {
        let api_messages: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(message_to_anthropic)
            .collect();

        let mut body = serde_json::json!({
            "model": self.default_model,
            "messages": api_messages,
            "max_tokens": max_tokens,
        });

        if let Some(system) = system {
            body["system"] = Value::String(system.to_string());
        }
        if !tools.is_empty() {
            let tools: Vec<Value> = tools.iter().map(tool_to_anthropic).collect();
            body["tools"] = Value::Array(tools);
        }
        body
    }

    async fn call(&self, messages: &[Message], max_tokens: u32, system: Option<&str>, tools: &[ToolDefinition]) -> Result<ProviderResponse> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let body = self.build_body(messages, max_tokens, system, tools);

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let text = resp.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            return Err(status_to_error(&self.id, status, &text));
        }
        let json: Value = serde_json::from_str(&text)?;
        parse_response(&json)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn send_message(&self, messages: &[Message], max_tokens: u32, system: Option<&str>, tools: &[ToolDefinition]) -> Result<ProviderResponse> {
        self.call(messages, max_tokens, system, tools).await
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

fn message_to_anthropic(msg: &Message) -> Value {
    let role = match msg.role {
        Role::User | Role::System => "user",
        Role::Assistant => "assistant",
    };
    let content: Vec<Value> = msg
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => serde_json::json!({"type": "text", "text": text}),
            ContentBlock::ToolUse { id, name, input } => {
                serde_json::json!({"type": "tool_use", "id": id, "name": name, "input": input})
            }
            ContentBlock::ToolResult { tool_use_id, output, is_error } => {
                serde_json::json!({"type": "tool_result", "tool_use_id": tool_use_id, "content": output, "is_error": is_error})
            }
        })
        .collect();
    serde_json::json!({"role": role, "content": content})
}

fn tool_to_anthropic(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.input_schema,
    })
}

fn parse_response(body: &Value) -> Result<ProviderResponse> {
    let blocks = body.get("content").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    let mut content = Vec::new();
    for block in &blocks {
        match block.get("type").and_then(|v| v.as_str()).unwrap_or("") {
            "text" => {
                if let Some(text) = block.get("text").and_then(|v| v.as_str()) {
                    content.push(ContentBlock::Text { text: text.to_string() });
                }
            }
            "tool_use" => {
                content.push(ContentBlock::ToolUse {
                    id: block.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    name: block.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    input: block.get("input").cloned().unwrap_or(Value::Object(Default::default())),
                });
            }
            _ => {}
        }
    }

    let stop_reason = body.get("stop_reason").and_then(|v| v.as_str()).map(str::to_string);
    let usage = body.get("usage").map(|u| Usage {
        input_tokens: u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        output_tokens: u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    }).unwrap_or_default();
    let model = body.get("model").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();

    Ok(ProviderResponse { content, stop_reason, usage, model })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_and_tool_use_blocks() {
        let body = serde_json::json!({
            "model": "claude-sonnet-4",
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5},
            "content": [
                {"type": "text", "text": "checking jira"},
                {"type": "tool_use", "id": "t1", "name": "get_jira_data", "input": {"id": "FEAT-1"}},
            ],
        });
        let resp = parse_response(&body).unwrap();
        assert_eq!(resp.content.len(), 2);
        assert_eq!(resp.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(resp.usage.input_tokens, 10);
    }
}
