//! A scriptable in-memory provider for tests: feeds a fixed sequence of
//! responses (or failures) back to callers, regardless of input.

use crate::traits::{LlmProvider, ProviderResponse, Usage};
use async_trait::async_trait;
use parking_lot::Mutex;
use ra_domain::{ContentBlock, Error, Message, Result, ToolDefinition};

pub enum ScriptedStep {
    Respond(ProviderResponse),
    Fail(Error),
}

pub struct MockProvider {
    id: String,
    steps: Mutex<Vec<ScriptedStep>>,
    calls: Mutex<usize>,
}

impl MockProvider {
    pub fn new(id: impl Into<String>, steps: Vec<ScriptedStep>) -> Self {
        Self {
            id: id.into(),
            steps: Mutex::new(steps),
            calls: Mutex::new(0),
        }
    }

    pub fn text_response(text: impl Into<String>) -> ProviderResponse {
        ProviderResponse {
            content: vec![ContentBlock::Text { text: text.into() }],
            stop_reason: Some("stop".to_string()),
            usage: Usage { input_tokens: 10, output_tokens: 10 },
            model: "mock-model".to_string(),
        }
    }

    pub fn tool_call_response(id: &str, name: &str, input: serde_json::Value) -> ProviderResponse {
        ProviderResponse {
            content: vec![ContentBlock::ToolUse { id: id.to_string(), name: name.to_string(), input }],
            stop_reason: Some("tool_use".to_string()),
            usage: Usage { input_tokens: 10, output_tokens: 10 },
            model: "mock-model".to_string(),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn send_message(&self, _messages: &[Message], _max_tokens: u32, _system: Option<&str>, _tools: &[ToolDefinition]) -> Result<ProviderResponse> {
        *self.calls.lock() += 1;
        let mut steps = self.steps.lock();
        if steps.is_empty() {
            return Err(Error::Other("mock provider ran out of scripted steps".to_string()));
        }
        match steps.remove(0) {
            ScriptedStep::Respond(resp) => Ok(resp),
            ScriptedStep::Fail(err) => Err(err),
        }
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
