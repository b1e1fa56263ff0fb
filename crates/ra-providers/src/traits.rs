use ra_domain::{ContentBlock, Message, Result, ToolCall, ToolDefinition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The structured response of one provider call: ordered content blocks,
/// the reason generation stopped, and token usage. No business logic lives
/// here — translation to/from the wire format is entirely the adapter's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Usage,
    pub model: String,
}

/// Abstracts the LLM wire protocol so the runtime is model-agnostic. Every
/// call is wrapped by the Retry Envelope inside each adapter's
/// implementation, using the classifier in `ra_domain::Error::is_retryable`.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn send_message(
        &self,
        messages: &[Message],
        max_tokens: u32,
        system: Option<&str>,
        tools: &[ToolDefinition],
    ) -> Result<ProviderResponse>;

    fn provider_id(&self) -> &str;

    fn extract_tool_calls(&self, response: &ProviderResponse) -> Vec<ToolCall> {
        response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    fn get_text_content(&self, response: &ProviderResponse) -> String {
        response
            .content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
