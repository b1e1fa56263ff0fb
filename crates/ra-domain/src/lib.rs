pub mod config;
pub mod conversation;
pub mod error;
pub mod eval;
pub mod memory;
pub mod message;
pub mod tool;
pub mod trace;

pub use conversation::{Conversation, SubConversation};
pub use error::{Error, Result};
pub use eval::{Baseline, Comparison, EvaluationResult, Scenario, SuiteResults};
pub use memory::{Decision, Memory};
pub use message::{ContentBlock, Message, Role};
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolResultMetadata};
pub use trace::{SpanLink, SpanStatus, TraceSpan};
