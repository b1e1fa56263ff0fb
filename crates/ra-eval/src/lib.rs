//! Evaluator: runs scripted [`Scenario`]s against an [`AgentCore`] and
//! scores the four behavioral dimensions of spec §4.10, aggregating into a
//! [`SuiteResults`] that can be persisted as a baseline and diffed on
//! later runs.

mod baseline;
mod decision;

pub use baseline::{load_baseline, save_baseline};
pub use ra_domain::eval::{compare_to_baseline, Baseline, Comparison};

use ra_agent::AgentCore;
use ra_domain::config::EvalWeights;
use ra_domain::{Conversation, Decision, EvaluationResult, Scenario, SuiteResults};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Runs one scenario end to end and scores it. Never panics on agent
/// failure: a provider or tool error becomes an [`EvaluationResult::errored`]
/// with every dimension at zero, so one bad scenario doesn't abort a suite.
pub async fn run_scenario(agent: &AgentCore, system_prompt: &str, weights: &EvalWeights, pass_threshold: f64, scenario: &Scenario) -> EvaluationResult {
    let started = Instant::now();
    let mut conversation = Conversation::new(system_prompt);

    let final_text = match agent.send_message(&mut conversation, &scenario.query).await {
        Ok(text) => text,
        Err(err) => return EvaluationResult::errored(scenario.id.clone(), err.to_string(), started.elapsed()),
    };

    score(scenario, &conversation, &final_text, weights, pass_threshold, started.elapsed())
}

/// Runs every scenario sequentially against the same agent (and thus the
/// same memory store and conversation history), matching how scenarios
/// are authored: later ones may depend on memories written by earlier ones.
pub async fn run_suite(agent: &AgentCore, system_prompt: &str, weights: &EvalWeights, pass_threshold: f64, scenarios: &[Scenario]) -> SuiteResults {
    let started = Instant::now();
    let mut results = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        results.push(run_scenario(agent, system_prompt, weights, pass_threshold, scenario).await);
    }
    SuiteResults::from_results(results, started.elapsed())
}

fn score(scenario: &Scenario, conversation: &Conversation, final_text: &str, weights: &EvalWeights, pass_threshold: f64, duration: Duration) -> EvaluationResult {
    let called_tools: Vec<&str> = conversation.messages.iter().flat_map(|m| m.tool_use_blocks()).map(|(_, name, _)| name).collect();

    let mut scores = BTreeMap::new();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    if let Some(expected_feature_id) = &scenario.expected_feature_id {
        let actual = first_feature_id(conversation.messages.iter().flat_map(|m| m.tool_use_blocks()).map(|(_, _, input)| input));
        let score = if actual.as_deref() == Some(expected_feature_id.as_str()) { 1.0 } else { 0.0 };
        scores.insert("feature_identification".to_string(), score);
        weighted_sum += score * weights.feature_identification;
        weight_total += weights.feature_identification;
    }

    let tool_usage = tool_usage_f1(&called_tools, &scenario.expected_tools);
    scores.insert("tool_usage".to_string(), tool_usage);
    weighted_sum += tool_usage * weights.tool_usage;
    weight_total += weights.tool_usage;

    let decision_quality = decision_quality_score(scenario, final_text);
    scores.insert("decision_quality".to_string(), decision_quality);
    weighted_sum += decision_quality * weights.decision_quality;
    weight_total += weights.decision_quality;

    let used_subconversation = !conversation.sub_conversations.is_empty();
    let context_management = if used_subconversation == scenario.expect_subconversation { 1.0 } else { 0.0 };
    scores.insert("context_management".to_string(), context_management);
    weighted_sum += context_management * weights.context_management;
    weight_total += weights.context_management;

    let overall = if weight_total > 0.0 { weighted_sum / weight_total } else { 0.0 };
    scores.insert("overall".to_string(), overall);

    let mut details = BTreeMap::new();
    details.insert("final_text".to_string(), serde_json::Value::String(final_text.to_string()));
    details.insert("called_tools".to_string(), serde_json::json!(called_tools));

    EvaluationResult {
        scenario_id: scenario.id.clone(),
        scores,
        passed: overall >= pass_threshold,
        details,
        duration,
        error: None,
    }
}

fn first_feature_id<'a>(inputs: impl Iterator<Item = &'a serde_json::Value>) -> Option<String> {
    inputs.filter_map(|input| input.get("feature_id")).filter_map(|v| v.as_str()).map(str::to_string).next()
}

/// F1 over tool-name multisets: both empty counts as a perfect match, since
/// a scenario that expects no tool use is satisfied by calling none.
fn tool_usage_f1(called: &[&str], expected: &[String]) -> f64 {
    if called.is_empty() && expected.is_empty() {
        return 1.0;
    }

    let mut called_counts: HashMap<&str, usize> = HashMap::new();
    for name in called {
        *called_counts.entry(*name).or_insert(0) += 1;
    }
    let mut expected_counts: HashMap<&str, usize> = HashMap::new();
    for name in expected {
        *expected_counts.entry(name.as_str()).or_insert(0) += 1;
    }

    let overlap: usize = called_counts.iter().map(|(name, count)| (*count).min(*expected_counts.get(name).unwrap_or(&0))).sum();

    let precision = if called.is_empty() { 0.0 } else { overlap as f64 / called.len() as f64 };
    let recall = if expected.is_empty() { 0.0 } else { overlap as f64 / expected.len() as f64 };

    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

const JUSTIFICATION_BONUS: f64 = 0.1;

fn decision_quality_score(scenario: &Scenario, final_text: &str) -> f64 {
    let expected = Decision::parse_case_insensitive(&scenario.expected_decision);
    let actual = decision::extract_decision(final_text);

    let base = match (expected, actual) {
        (Some(expected), Some(actual)) if expected == actual => 0.5,
        (Some(expected), Some(actual)) if expected.is_adjacent(&actual) => 0.3,
        _ => 0.0,
    };

    let lower = final_text.to_ascii_lowercase();
    let keyword_bonus = scenario.justification_keywords.iter().filter(|kw| lower.contains(&kw.to_ascii_lowercase())).count() as f64 * JUSTIFICATION_BONUS;

    (base + keyword_bonus).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ra_domain::config::AgentConfig;
    use ra_domain::config::RetryConfig;
    use ra_providers::mock::{MockProvider, ScriptedStep};
    use ra_tools::{SyncHandler, ToolRegistry};
    use std::sync::Arc;

    fn weights() -> EvalWeights {
        EvalWeights::default()
    }

    fn build_agent(main: MockProvider) -> (AgentCore, tempfile::TempDir, tempfile::TempDir) {
        let traces_dir = tempfile::tempdir().unwrap();
        let conv_dir = tempfile::tempdir().unwrap();
        let tracer = Arc::new(ra_tracer::Tracer::new(traces_dir.path()).unwrap());
        let tools = Arc::new(ToolRegistry::new(tracer.clone()));
        tools
            .register("get_jira_data", "fetch jira data", serde_json::json!({"type": "object"}), Arc::new(SyncHandler(|input| Ok(input))))
            .unwrap();
        let store = Arc::new(ra_store::ConversationStore::new(conv_dir.path()).unwrap());
        let agent = AgentCore::new(
            Arc::new(main),
            Arc::new(MockProvider::new("summarizer", vec![])),
            tools,
            store,
            tracer,
            Arc::new(ra_memory::NoneMemoryStore),
            AgentConfig::default(),
            RetryConfig::default(),
        );
        (agent, traces_dir, conv_dir)
    }

    fn scenario() -> Scenario {
        Scenario {
            id: "s1".to_string(),
            query: "is FEAT-1 ready?".to_string(),
            expected_feature_id: Some("FEAT-1".to_string()),
            expected_tools: vec!["get_jira_data".to_string()],
            expected_decision: "ready".to_string(),
            justification_keywords: vec!["tests passing".to_string()],
            expect_subconversation: false,
        }
    }

    #[tokio::test]
    async fn a_perfect_run_scores_well_above_the_pass_threshold() {
        let main = MockProvider::new(
            "main",
            vec![
                ScriptedStep::Respond(MockProvider::tool_call_response("call-1", "get_jira_data", serde_json::json!({"feature_id": "FEAT-1"}))),
                ScriptedStep::Respond(MockProvider::text_response("ready: all tests passing and coverage is high")),
            ],
        );
        let (agent, _t, _c) = build_agent(main);

        let result = run_scenario(&agent, "system prompt", &weights(), 0.7, &scenario()).await;

        assert!(result.passed, "expected a pass, got scores {:?}", result.scores);
        assert_eq!(result.scores["feature_identification"], 1.0);
        assert_eq!(result.scores["tool_usage"], 1.0);
        assert!(result.scores["decision_quality"] >= 0.6);
    }

    #[tokio::test]
    async fn a_wrong_decision_fails_the_scenario() {
        let main = MockProvider::new(
            "main",
            vec![
                ScriptedStep::Respond(MockProvider::tool_call_response("call-1", "get_jira_data", serde_json::json!({"feature_id": "FEAT-1"}))),
                ScriptedStep::Respond(MockProvider::text_response("not ready: missing coverage")),
            ],
        );
        let (agent, _t, _c) = build_agent(main);

        let result = run_scenario(&agent, "system prompt", &weights(), 0.7, &scenario()).await;

        assert_eq!(result.scores["decision_quality"], 0.0);
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn a_provider_failure_produces_an_errored_result() {
        let main = MockProvider::new("main", vec![ScriptedStep::Fail(ra_domain::Error::Validation("bad request".to_string()))]);
        let (agent, _t, _c) = build_agent(main);

        let result = run_scenario(&agent, "system prompt", &weights(), 0.7, &scenario()).await;

        assert!(!result.passed);
        assert!(result.error.is_some());
        assert_eq!(result.scores["overall"], 0.0);
    }

    #[test]
    fn tool_usage_f1_rewards_exact_match() {
        assert_eq!(tool_usage_f1(&["get_jira_data"], &["get_jira_data".to_string()]), 1.0);
    }

    #[test]
    fn tool_usage_f1_both_empty_is_perfect() {
        assert_eq!(tool_usage_f1(&[], &[]), 1.0);
    }

    #[test]
    fn tool_usage_f1_penalizes_extra_calls() {
        let score = tool_usage_f1(&["get_jira_data", "read_doc"], &["get_jira_data".to_string()]);
        assert!(score < 1.0 && score > 0.0);
    }

    #[test]
    fn decision_quality_gives_partial_credit_for_adjacent_decisions() {
        let scenario = Scenario {
            id: "s".to_string(),
            query: "q".to_string(),
            expected_feature_id: None,
            expected_tools: vec![],
            expected_decision: "ready".to_string(),
            justification_keywords: vec![],
            expect_subconversation: false,
        };
        assert_eq!(decision_quality_score(&scenario, "I'd call this borderline"), 0.3);
    }
}
