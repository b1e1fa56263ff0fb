//! Best-effort extraction of a structured verdict from the assistant's
//! final free text, used to decide whether to write a [`Memory`] entry.

use ra_domain::Decision;

/// Finds a decision keyword in `text`, preferring the two-word "not ready"
/// phrasing over a bare "ready" match so "not ready" isn't misread as
/// "ready".
pub fn find_decision(text: &str) -> Option<Decision> {
    let lower = text.to_ascii_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    for i in 0..words.len() {
        if words[i] == "not" && words.get(i + 1) == Some(&"ready") {
            return Some(Decision::NotReady);
        }
    }
    words.iter().find_map(|w| Decision::parse_case_insensitive(w))
}
