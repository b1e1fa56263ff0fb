use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

/// An isolated, depth-1 child conversation opened to analyze one oversized
/// tool result. Its message list never merges into the parent's; only
/// `summary` is retained by the parent once set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubConversation {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub purpose: String,
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub summary: Option<String>,
    pub original_tokens: usize,
    pub summary_tokens: usize,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SubConversation {
    pub fn open(parent_id: Uuid, purpose: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id,
            purpose: purpose.into(),
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
            summary: None,
            original_tokens: 0,
            summary_tokens: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.summary.is_some()
    }

    pub fn complete(&mut self, summary: String, original_tokens: usize, summary_tokens: usize) {
        self.summary = Some(summary);
        self.original_tokens = original_tokens;
        self.summary_tokens = summary_tokens;
        self.completed_at = Some(Utc::now());
    }

    pub fn compression_ratio(&self) -> f64 {
        if self.summary_tokens == 0 {
            return 0.0;
        }
        self.original_tokens as f64 / self.summary_tokens as f64
    }
}

/// The unit of persistence for an agent's interaction history with a user.
///
/// Messages grow monotonically; nothing is ever deleted. `updated_at` is
/// never earlier than `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub trace_ids: Vec<String>,
    pub sub_conversations: Vec<SubConversation>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
            trace_ids: Vec::new(),
            sub_conversations: Vec::new(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now < self.updated_at { self.updated_at } else { now };
    }

    pub fn push_trace_id(&mut self, trace_id: impl Into<String>) {
        self.trace_ids.push(trace_id.into());
    }

    /// Last `n` trace ids, oldest first, excluding the current (most recent) one.
    pub fn prior_trace_roots(&self, n: usize) -> Vec<String> {
        let len = self.trace_ids.len();
        if len <= 1 {
            return Vec::new();
        }
        let without_current = &self.trace_ids[..len - 1];
        let start = without_current.len().saturating_sub(n);
        without_current[start..].to_vec()
    }

    pub fn push_sub_conversation(&mut self, sub: SubConversation) {
        self.sub_conversations.push(sub);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_trace_roots_excludes_current_and_caps_at_three() {
        let mut conv = Conversation::new("system");
        for id in ["a", "b", "c", "d", "e"] {
            conv.push_trace_id(id);
        }
        assert_eq!(conv.prior_trace_roots(3), vec!["b", "c", "d"]);
    }

    #[test]
    fn sub_conversation_compression_ratio() {
        let mut sub = SubConversation::open(Uuid::new_v4(), "analyze read_doc(x)", "sys");
        sub.complete("summary".into(), 5000, 500);
        assert_eq!(sub.compression_ratio(), 10.0);
        assert!(sub.is_complete());
    }
}
