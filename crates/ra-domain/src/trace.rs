use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    Ok,
    Error,
    Cancelled,
}

/// A non-parent, non-child reference to a span in another (or the same)
/// trace, used to keep cross-turn traces discoverable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanLink {
    pub trace_id: String,
    pub span_id: String,
}

/// One entry in a trace file. Created on entry to an instrumented scope,
/// flushed on scope exit. `end_time` is always `>= start_time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSpan {
    pub trace_id: String,
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub name: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub links: Vec<SpanLink>,
    pub status: SpanStatus,
}

impl TraceSpan {
    pub fn open(trace_id: impl Into<String>, span_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            parent_span_id: None,
            name: name.into(),
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            attributes: BTreeMap::new(),
            links: Vec::new(),
            status: SpanStatus::Ok,
        }
    }

    pub fn with_parent(mut self, parent_span_id: impl Into<String>) -> Self {
        self.parent_span_id = Some(parent_span_id.into());
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn link(&mut self, trace_id: impl Into<String>, span_id: impl Into<String>) {
        self.links.push(SpanLink {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
        });
    }

    pub fn close(&mut self, status: SpanStatus) {
        let end = Utc::now();
        self.duration_ms = Some((end - self.start_time).num_milliseconds().max(0));
        self.end_time = Some(end);
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_sets_nonnegative_duration() {
        let mut span = TraceSpan::open("trace-1", "span-1", "send_message");
        span.close(SpanStatus::Ok);
        assert!(span.end_time.unwrap() >= span.start_time);
        assert!(span.duration_ms.unwrap() >= 0);
    }
}
