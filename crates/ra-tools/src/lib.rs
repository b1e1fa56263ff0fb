//! Tool Registry: name -> {schema, async handler} table. Validates inputs
//! against JSON Schema, executes, and always returns a structured
//! [`ToolResult`] — handlers never abort the turn, they report failure.

use async_trait::async_trait;
use ra_domain::{Error, Result, SpanStatus, ToolCall, ToolDefinition, ToolResult};
use ra_tracer::Tracer;
use regex_lite_name_check as name_check;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Pure async callable with respect to the registry: any I/O failure is the
/// handler's to catch and report as `Err`, never a panic or raised
/// exception.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, input: serde_json::Value) -> std::result::Result<serde_json::Value, String>;
}

/// Adapts a synchronous closure into a [`ToolHandler`], for tools with no
/// suspension points (tests, pure computations).
pub struct SyncHandler<F>(pub F)
where
    F: Fn(serde_json::Value) -> std::result::Result<serde_json::Value, String> + Send + Sync;

#[async_trait]
impl<F> ToolHandler for SyncHandler<F>
where
    F: Fn(serde_json::Value) -> std::result::Result<serde_json::Value, String> + Send + Sync,
{
    async fn call(&self, input: serde_json::Value) -> std::result::Result<serde_json::Value, String> {
        (self.0)(input)
    }
}

struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
    tracer: Arc<Tracer>,
}

impl ToolRegistry {
    pub fn new(tracer: Arc<Tracer>) -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            tracer,
        }
    }

    /// Idempotent per name: a second registration with the same name is an
    /// error.
    pub fn register(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<()> {
        let name = name.into();
        if !name_check::is_valid_tool_name(&name) {
            return Err(Error::Validation(format!(
                "tool name {name:?} must match ^[a-zA-Z_][a-zA-Z0-9_]*$"
            )));
        }
        let mut tools = self.tools.write().unwrap();
        if tools.contains_key(&name) {
            return Err(Error::Validation(format!("tool {name:?} is already registered")));
        }
        tools.insert(
            name.clone(),
            RegisteredTool {
                definition: ToolDefinition {
                    name,
                    description: description.into(),
                    input_schema,
                },
                handler,
            },
        );
        Ok(())
    }

    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.read().unwrap().values().map(|t| t.definition.clone()).collect()
    }

    /// Executes a tool call, wrapped in its own span. Never raises: invalid
    /// input, unknown tool name, and handler errors all produce a failed
    /// `ToolResult`.
    pub async fn execute(&self, trace_id: &str, parent_span_id: &str, tool_call: &ToolCall) -> ToolResult {
        let mut span = self.tracer.open_span(trace_id, "execute_tool", Some(parent_span_id));
        span.set_attr("tool.name", tool_call.name.clone());

        let started = Instant::now();
        let (result, status) = self.execute_inner(tool_call).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        span.set_attr("tool.success", result.success);
        span.set_attr("tool.duration_ms", duration_ms);
        let _ = self.tracer.finish(span, status);

        let mut result = result;
        result.metadata.duration_ms = duration_ms;
        result
    }

    async fn execute_inner(&self, tool_call: &ToolCall) -> (ToolResult, SpanStatus) {
        let (definition, handler) = {
            let tools = self.tools.read().unwrap();
            match tools.get(&tool_call.name) {
                Some(t) => (t.definition.clone(), t.handler.clone()),
                None => {
                    return (
                        ToolResult::failed(&tool_call.id, "unknown tool", 0),
                        SpanStatus::Error,
                    )
                }
            }
        };

        let compiled = match jsonschema::JSONSchema::compile(&definition.input_schema) {
            Ok(c) => c,
            Err(e) => {
                return (
                    ToolResult::failed(&tool_call.id, format!("invalid input: {e}"), 0),
                    SpanStatus::Error,
                )
            }
        };
        if let Err(mut errors) = compiled.validate(&tool_call.input) {
            let e = errors.next().map(|e| e.to_string()).unwrap_or_default();
            return (
                ToolResult::failed(&tool_call.id, format!("invalid input: {e}"), 0),
                SpanStatus::Error,
            );
        }

        match handler.call(tool_call.input.clone()).await {
            Ok(value) => {
                let content = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (ToolResult::ok(&tool_call.id, content, 0), SpanStatus::Ok)
            }
            Err(message) => (ToolResult::failed(&tool_call.id, message, 0), SpanStatus::Error),
        }
    }
}

/// Minimal identifier check, kept dependency-free since it's a single regex
/// the `regex` crate would be overkill for.
mod regex_lite_name_check {
    pub fn is_valid_tool_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ToolRegistry {
        let dir = tempfile::tempdir().unwrap();
        ToolRegistry::new(Arc::new(Tracer::new(dir.path()).unwrap()))
    }

    fn echo_handler() -> Arc<dyn ToolHandler> {
        Arc::new(SyncHandler(|input: serde_json::Value| Ok(input)))
    }

    #[test]
    fn register_rejects_invalid_names() {
        let registry = registry();
        let err = registry.register("123bad", "desc", serde_json::json!({"type": "object"}), echo_handler());
        assert!(err.is_err());
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let registry = registry();
        registry.register("get_jira_data", "desc", serde_json::json!({"type": "object"}), echo_handler()).unwrap();
        let err = registry.register("get_jira_data", "desc again", serde_json::json!({"type": "object"}), echo_handler());
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn execute_unknown_tool_returns_failed_result_not_error() {
        let registry = registry();
        let call = ToolCall {
            id: "t1".into(),
            name: "nonexistent".into(),
            input: serde_json::json!({}),
        };
        let result = registry.execute("trace-1", "span-1", &call).await;
        assert!(!result.success);
        assert_eq!(result.content, "unknown tool");
    }

    #[tokio::test]
    async fn execute_validates_input_schema() {
        let registry = registry();
        let schema = serde_json::json!({
            "type": "object",
            "required": ["feature_id"],
            "properties": {"feature_id": {"type": "string"}},
        });
        registry.register("get_jira_data", "desc", schema, echo_handler()).unwrap();

        let call = ToolCall {
            id: "t1".into(),
            name: "get_jira_data".into(),
            input: serde_json::json!({}),
        };
        let result = registry.execute("trace-1", "span-1", &call).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn execute_runs_handler_on_valid_input() {
        let registry = registry();
        registry
            .register("get_jira_data", "desc", serde_json::json!({"type": "object"}), echo_handler())
            .unwrap();
        let call = ToolCall {
            id: "t1".into(),
            name: "get_jira_data".into(),
            input: serde_json::json!({"feature_id": "FEAT-1"}),
        };
        let result = registry.execute("trace-1", "span-1", &call).await;
        assert!(result.success);
    }
}
