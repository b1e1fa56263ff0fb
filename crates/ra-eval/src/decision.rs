//! Best-effort decision extraction from free text, used to score
//! `decision_quality` against a scenario's expected verdict. Mirrors the
//! heuristic the Agent Core itself uses to decide whether to persist a
//! memory, so the Evaluator judges the Agent by the same reading of its
//! own output.

use ra_domain::Decision;

pub fn extract_decision(text: &str) -> Option<Decision> {
    let lower = text.to_ascii_lowercase();
    let words: Vec<&str> = lower.split(|c: char| !c.is_ascii_alphanumeric()).filter(|w| !w.is_empty()).collect();

    for i in 0..words.len() {
        if words[i] == "not" && words.get(i + 1) == Some(&"ready") {
            return Some(Decision::NotReady);
        }
    }
    words.iter().find_map(|w| Decision::parse_case_insensitive(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ready() {
        assert_eq!(extract_decision("Verdict: ready to ship."), Some(Decision::Ready));
    }

    #[test]
    fn extracts_not_ready_over_bare_ready() {
        assert_eq!(extract_decision("not ready, coverage is too low"), Some(Decision::NotReady));
    }

    #[test]
    fn returns_none_without_a_keyword() {
        assert_eq!(extract_decision("still investigating"), None);
    }
}
