//! Adapter for OpenAI-compatible chat-completions endpoints (OpenAI itself,
//! and any self-hosted gateway implementing the same wire shape).

use crate::traits::{LlmProvider, ProviderResponse, Usage};
use crate::util::{from_reqwest, resolve_api_key, status_to_error};
use async_trait::async_trait;
use ra_domain::{ContentBlock, Message, Result, Role, ToolDefinition};
use serde_json::Value;

/// Single-attempt adapter; see [`crate::anthropic::AnthropicProvider`] for
/// why retries are not wrapped in here.
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
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
        let mut api_messages: Vec<Value> = Vec::new();
        if let Some(system) = system {
            api_messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        for msg in messages {
            if msg.role == Role::System {
                continue;
            }
            api_messages.push(message_to_openai(msg));
        }

        let mut body = serde_json::json!({
            "model": self.default_model,
            "messages": api_messages,
            "max_tokens": max_tokens,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(tool_to_openai).collect());
        }
        body
    }

    async fn call(&self, messages: &[Message], max_tokens: u32, system: Option<&str>, tools: &[ToolDefinition]) -> Result<ProviderResponse> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = self.build_body(messages, max_tokens, system, tools);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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
impl LlmProvider for OpenAiCompatProvider {
    async fn send_message(&self, messages: &[Message], max_tokens: u32, system: Option<&str>, tools: &[ToolDefinition]) -> Result<ProviderResponse> {
        self.call(messages, max_tokens, system, tools).await
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

fn message_to_openai(msg: &Message) -> Value {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    };

    let tool_calls: Vec<Value> = msg
        .content
        .iter()
        .filter_map(|b| match b {
            ContentBlock::ToolUse { id, name, input } => Some(serde_json::json!({
                "id": id,
                "type": "function",
                "function": {"name": name, "arguments": input.to_string()},
            })),
            _ => None,
        })
        .collect();

    if let Some(ContentBlock::ToolResult { tool_use_id, output, .. }) = msg.content.iter().find(|b| matches!(b, ContentBlock::ToolResult { .. })) {
        return serde_json::json!({"role": "tool", "tool_call_id": tool_use_id, "content": output});
    }

    let text = msg.text_content();
    if tool_calls.is_empty() {
        serde_json::json!({"role": role, "content": text})
    } else {
        serde_json::json!({"role": role, "content": text, "tool_calls": tool_calls})
    }
}

fn tool_to_openai(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

fn parse_response(body: &Value) -> Result<ProviderResponse> {
    let choice = body
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| ra_domain::Error::Provider {
            provider: "openai_compat".to_string(),
            message: "response had no choices".to_string(),
        })?;

    let message = choice.get("message").cloned().unwrap_or(Value::Null);
    let mut content = Vec::new();
    if let Some(text) = message.get("content").and_then(|v| v.as_str()) {
        if !text.is_empty() {
            content.push(ContentBlock::Text { text: text.to_string() });
        }
    }
    if let Some(tool_calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for tc in tool_calls {
            let id = tc.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let function = tc.get("function").cloned().unwrap_or(Value::Null);
            let name = function.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let args_str = function.get("arguments").and_then(|v| v.as_str()).unwrap_or("{}");
            let input: Value = serde_json::from_str(args_str).unwrap_or(Value::Object(Default::default()));
            content.push(ContentBlock::ToolUse { id, name, input });
        }
    }

    let stop_reason = choice.get("finish_reason").and_then(|v| v.as_str()).map(str::to_string);
    let usage = body.get("usage").map(|u| Usage {
        input_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        output_tokens: u.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    }).unwrap_or_default();
    let model = body.get("model").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();

    Ok(ProviderResponse { content, stop_reason, usage, model })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_call_arguments_from_json_string() {
        let body = serde_json::json!({
            "model": "gpt-4o",
            "usage": {"prompt_tokens": 20, "completion_tokens": 8},
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "function": {"name": "get_analysis", "arguments": "{\"feature_id\":\"FEAT-1\"}"}
                    }]
                }
            }]
        });
        let resp = parse_response(&body).unwrap();
        assert_eq!(resp.content.len(), 1);
        match &resp.content[0] {
            ContentBlock::ToolUse { name, input, .. } => {
                assert_eq!(name, "get_analysis");
                assert_eq!(input["feature_id"], "FEAT-1");
            }
            _ => panic!("expected tool use block"),
        }
    }
}
