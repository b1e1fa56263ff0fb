//! The built-in demo scenario suite, mirroring the three worked examples
//! in the testable-properties list: a clean pass, a clear fail, and a
//! large-document case that forces sub-conversation delegation.

use ra_domain::Scenario;

pub fn default_suite() -> Vec<Scenario> {
    vec![
        Scenario {
            id: "green-feature-ready".to_string(),
            query: "Is FEAT-MS-001 ready for production?".to_string(),
            expected_feature_id: Some("FEAT-MS-001".to_string()),
            expected_tools: vec!["get_jira_data".to_string(), "get_analysis".to_string()],
            expected_decision: "ready".to_string(),
            justification_keywords: vec!["tests".to_string(), "passing".to_string(), "approved".to_string()],
            expect_subconversation: false,
        },
        Scenario {
            id: "failing-feature-not-ready".to_string(),
            query: "Can we promote FEAT-QR-002?".to_string(),
            expected_feature_id: Some("FEAT-QR-002".to_string()),
            expected_tools: vec!["get_jira_data".to_string(), "get_analysis".to_string()],
            expected_decision: "not_ready".to_string(),
            justification_keywords: vec!["failures".to_string(), "error".to_string()],
            expect_subconversation: false,
        },
        Scenario {
            id: "large-doc-forces-subconversation".to_string(),
            query: "Review the architecture documentation and tell me if it's current.".to_string(),
            expected_feature_id: None,
            expected_tools: vec!["list_docs".to_string(), "read_doc".to_string()],
            expected_decision: "borderline".to_string(),
            justification_keywords: vec![],
            expect_subconversation: true,
        },
    ]
}

pub fn load_suite(path: Option<&str>) -> anyhow::Result<Vec<Scenario>> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(default_suite()),
    }
}
