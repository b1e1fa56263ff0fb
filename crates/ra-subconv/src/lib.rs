//! Sub-Conversation Manager: opens an isolated, depth-1 child conversation
//! to analyze a single oversized tool output, drives it to a summary
//! through the summarization model, and returns only the summary to the
//! parent conversation.

use ra_domain::config::RetryConfig;
use ra_domain::{Conversation, Message, Result, SpanStatus, SubConversation, ToolResult, ToolResultMetadata};
use ra_providers::LlmProvider;
use ra_tracer::Tracer;
use std::sync::Arc;

const WARN_RATIO_THRESHOLD: f64 = 0.4;
const HEAD_CHARS: usize = 1000;
const TAIL_CHARS: usize = 500;

pub fn should_trigger(content: &str, threshold_tokens: usize) -> bool {
    ra_tokens::count_tokens(content) > threshold_tokens
}

pub struct SubConversationManager {
    tracer: Arc<Tracer>,
    retry: RetryConfig,
}

impl SubConversationManager {
    pub fn new(tracer: Arc<Tracer>, retry: RetryConfig) -> Self {
        Self { tracer, retry }
    }

    /// Runs the full protocol of spec §4.7: open, summarize, record, return.
    /// Never raises; on summarization failure it falls back to a
    /// head+tail-truncated version of the original content.
    pub async fn analyze(
        &self,
        summarizer: &dyn LlmProvider,
        parent: &mut Conversation,
        tool_call_id: &str,
        raw_content: &str,
        purpose: impl Into<String>,
        trace_id: &str,
        parent_span_id: &str,
    ) -> Result<ToolResult> {
        let purpose = purpose.into();
        let system_prompt = "You are analyzing tool output on behalf of a release-readiness \
             investigation agent. Extract only information relevant to the user's assessment \
             task, citing specific metrics and risks. Be concise."
            .to_string();

        let mut sub = SubConversation::open(parent.id, purpose.clone(), system_prompt.clone());
        let original_tokens = ra_tokens::count_tokens(raw_content);

        let mut span = self.tracer.open_span(trace_id, "sub_conversation", Some(parent_span_id));
        span.set_attr("sub_conversation.purpose", purpose.clone());
        span.set_attr("sub_conversation.original_tokens", original_tokens as u64);

        let prompt = format!("{purpose}\n\nCONTENT TO ANALYZE:\n{raw_content}");
        sub.messages.push(Message::user_text(&prompt));

        let outcome = ra_retry::with_retry("subconv.summarize", &self.retry, || {
            summarizer.send_message(&sub.messages, 2000, Some(&system_prompt), &[])
        })
        .await;

        let (summary, fallback) = match outcome {
            Ok(response) => (summarizer.get_text_content(&response), false),
            Err(err) => {
                tracing::warn!(purpose = %purpose, error = %err, "sub-conversation summarization failed, falling back to truncation");
                (truncate_head_tail(raw_content), true)
            }
        };

        let summary_tokens = ra_tokens::count_tokens(&summary);
        sub.complete(summary.clone(), original_tokens, summary_tokens);
        let compression_ratio = sub.compression_ratio();

        span.set_attr("sub_conversation.summary_tokens", summary_tokens as u64);
        span.set_attr("sub_conversation.compression_ratio", compression_ratio);
        span.set_attr("fallback", fallback);
        if !fallback && original_tokens > 0 && summary_tokens as f64 >= original_tokens as f64 * WARN_RATIO_THRESHOLD {
            span.set_attr("warning", "summary_ratio_above_40_percent");
        }
        let _ = self.tracer.finish(span, SpanStatus::Ok);

        let subconversation_id = sub.id;
        parent.push_sub_conversation(sub);

        Ok(ToolResult {
            tool_call_id: tool_call_id.to_string(),
            content: summary,
            success: true,
            metadata: ToolResultMetadata {
                subconversation_id: Some(subconversation_id),
                original_tokens: Some(original_tokens),
                summary_tokens: Some(summary_tokens),
                compression_ratio: Some(compression_ratio),
                duration_ms: 0,
            },
        })
    }
}

/// Head+tail truncation with a middle-elided marker, used when
/// summarization fails after retry.
fn truncate_head_tail(content: &str) -> String {
    if content.chars().count() <= HEAD_CHARS + TAIL_CHARS {
        return content.to_string();
    }
    let chars: Vec<char> = content.chars().collect();
    let head: String = chars[..HEAD_CHARS].iter().collect();
    let tail: String = chars[chars.len() - TAIL_CHARS..].iter().collect();
    format!("{head}\n[...truncated...]\n{tail}")
}
