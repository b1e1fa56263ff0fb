use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A scripted user query with expected behavioral outcomes, immutable once
/// loaded from the scenario registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_feature_id: Option<String>,
    #[serde(default)]
    pub expected_tools: Vec<String>,
    pub expected_decision: String,
    #[serde(default)]
    pub justification_keywords: Vec<String>,
    #[serde(default)]
    pub expect_subconversation: bool,
}

fn duration_ms<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

fn duration_ms_de<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    let ms = u64::deserialize(d)?;
    Ok(Duration::from_millis(ms))
}

/// Produced per [`Scenario`] by `run_scenario`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub scenario_id: String,
    pub scores: BTreeMap<String, f64>,
    pub passed: bool,
    pub details: BTreeMap<String, serde_json::Value>,
    #[serde(serialize_with = "duration_ms", deserialize_with = "duration_ms_de")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationResult {
    pub fn errored(scenario_id: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        let mut scores = BTreeMap::new();
        for dim in ["feature_identification", "tool_usage", "decision_quality", "context_management", "overall"] {
            scores.insert(dim.to_string(), 0.0);
        }
        Self {
            scenario_id: scenario_id.into(),
            scores,
            passed: false,
            details: BTreeMap::new(),
            duration,
            error: Some(error.into()),
        }
    }
}

/// Aggregates a full run of [`EvaluationResult`]s, persisted as a baseline
/// snapshot for regression comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResults {
    pub total: usize,
    pub passed: usize,
    pub pass_rate: f64,
    pub avg_scores: BTreeMap<String, f64>,
    pub scenario_results: Vec<EvaluationResult>,
    #[serde(serialize_with = "duration_ms", deserialize_with = "duration_ms_de")]
    pub duration: Duration,
}

impl SuiteResults {
    pub fn from_results(scenario_results: Vec<EvaluationResult>, duration: Duration) -> Self {
        let total = scenario_results.len();
        let passed = scenario_results.iter().filter(|r| r.passed).count();
        let pass_rate = if total == 0 { 0.0 } else { passed as f64 / total as f64 };

        let mut sums: BTreeMap<String, f64> = BTreeMap::new();
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for r in &scenario_results {
            for (dim, score) in &r.scores {
                *sums.entry(dim.clone()).or_insert(0.0) += score;
                *counts.entry(dim.clone()).or_insert(0) += 1;
            }
        }
        let avg_scores = sums
            .into_iter()
            .map(|(dim, sum)| {
                let count = counts[&dim].max(1);
                (dim, sum / count as f64)
            })
            .collect();

        Self {
            total,
            passed,
            pass_rate,
            avg_scores,
            scenario_results,
            duration,
        }
    }
}

/// A persisted [`SuiteResults`] used as the reference point for regression
/// comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub summary: SuiteResults,
}

/// Per-dimension deltas between a current run and a baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub deltas: BTreeMap<String, f64>,
    pub has_regression: bool,
    pub improvements: Vec<String>,
}

const REGRESSION_THRESHOLD: f64 = 0.05;

pub fn compare_to_baseline(current: &SuiteResults, baseline: &SuiteResults) -> Comparison {
    let mut deltas = BTreeMap::new();
    let mut has_regression = false;
    let mut improvements = Vec::new();

    let mut dims: Vec<&String> = current.avg_scores.keys().chain(baseline.avg_scores.keys()).collect();
    dims.sort();
    dims.dedup();

    for dim in dims {
        let cur = current.avg_scores.get(dim).copied().unwrap_or(0.0);
        let base = baseline.avg_scores.get(dim).copied().unwrap_or(0.0);
        let delta = cur - base;
        deltas.insert(dim.clone(), delta);
        if delta < -REGRESSION_THRESHOLD {
            has_regression = true;
        }
        if delta > REGRESSION_THRESHOLD {
            improvements.push(dim.clone());
        }
    }

    Comparison {
        deltas,
        has_regression,
        improvements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(scenario_id: &str, overall: f64) -> EvaluationResult {
        let mut scores = BTreeMap::new();
        scores.insert("overall".to_string(), overall);
        EvaluationResult {
            scenario_id: scenario_id.to_string(),
            scores,
            passed: overall >= 0.7,
            details: BTreeMap::new(),
            duration: Duration::from_millis(10),
            error: None,
        }
    }

    #[test]
    fn suite_results_pass_rate() {
        let results = vec![result("a", 0.9), result("b", 0.4)];
        let suite = SuiteResults::from_results(results, Duration::from_secs(1));
        assert_eq!(suite.total, 2);
        assert_eq!(suite.passed, 1);
        assert_eq!(suite.pass_rate, 0.5);
    }

    #[test]
    fn compare_to_baseline_with_self_is_zero() {
        let suite = SuiteResults::from_results(vec![result("a", 0.9)], Duration::from_secs(1));
        let cmp = compare_to_baseline(&suite, &suite);
        assert!(!cmp.has_regression);
        assert!(cmp.improvements.is_empty());
        assert!(cmp.deltas.values().all(|d| *d == 0.0));
    }

    #[test]
    fn compare_to_baseline_detects_regression() {
        let current = SuiteResults::from_results(vec![result("a", 0.5)], Duration::from_secs(1));
        let baseline = SuiteResults::from_results(vec![result("a", 0.9)], Duration::from_secs(1));
        let cmp = compare_to_baseline(&current, &baseline);
        assert!(cmp.has_regression);
    }
}
