use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Ready,
    NotReady,
    Borderline,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Ready => "ready",
            Decision::NotReady => "not_ready",
            Decision::Borderline => "borderline",
        }
    }

    /// Linear adjacency chain fixed by the system: `ready - borderline - not_ready`.
    pub fn is_adjacent(&self, other: &Decision) -> bool {
        matches!(
            (self, other),
            (Decision::Ready, Decision::Borderline)
                | (Decision::Borderline, Decision::Ready)
                | (Decision::Borderline, Decision::NotReady)
                | (Decision::NotReady, Decision::Borderline)
        )
    }

    pub fn parse_case_insensitive(s: &str) -> Option<Decision> {
        match s.to_ascii_lowercase().as_str() {
            "ready" => Some(Decision::Ready),
            "not_ready" | "not ready" => Some(Decision::NotReady),
            "borderline" => Some(Decision::Borderline),
            _ => None,
        }
    }
}

/// A past assessment, written after the Agent produces a verdict and
/// retrieved on subsequent assessments of the same or related features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub feature_id: String,
    pub decision: Decision,
    pub justification: String,
    pub key_findings: BTreeMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Memory {
    pub fn new(
        feature_id: impl Into<String>,
        decision: Decision,
        justification: impl Into<String>,
        key_findings: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            feature_id: feature_id.into(),
            decision,
            justification: justification.into(),
            key_findings,
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// Text used by vector-backed stores for semantic similarity search.
    pub fn searchable_text(&self) -> String {
        let findings = self
            .key_findings
            .values()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} {}", self.justification, findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacency_is_a_linear_chain() {
        assert!(Decision::Ready.is_adjacent(&Decision::Borderline));
        assert!(Decision::NotReady.is_adjacent(&Decision::Borderline));
        assert!(!Decision::Ready.is_adjacent(&Decision::NotReady));
        assert!(!Decision::Ready.is_adjacent(&Decision::Ready));
    }

    #[test]
    fn parse_case_insensitive_roundtrips() {
        assert_eq!(Decision::parse_case_insensitive("READY"), Some(Decision::Ready));
        assert_eq!(Decision::parse_case_insensitive("Not_Ready"), Some(Decision::NotReady));
        assert_eq!(Decision::parse_case_insensitive("bogus"), None);
    }
}
