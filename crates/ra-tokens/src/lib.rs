//! Cheap, deterministic token estimation for context-accounting decisions
//! (sub-conversation triggers, truncation) — never for billing.
//!
//! A fixed byte-pair-encoding approximation: count "word-ish" runs and
//! punctuation as roughly one token each, then correct for the
//! characters-per-token ratio real BPE tokenizers settle around for
//! English prose. Deviating from any one provider's exact tokenizer by
//! more than 10% is acceptable per spec.

use ra_domain::Message;

const CHARS_PER_TOKEN: f64 = 4.0;

pub fn count_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let char_estimate = (text.chars().count() as f64 / CHARS_PER_TOKEN).ceil();
    let word_estimate = text.split_whitespace().count() as f64;
    char_estimate.max(word_estimate) as usize
}

pub fn count_message_tokens(message: &Message) -> usize {
    message
        .content
        .iter()
        .map(|block| match block {
            ra_domain::ContentBlock::Text { text } => count_tokens(text),
            ra_domain::ContentBlock::ToolUse { name, input, .. } => {
                count_tokens(name) + count_tokens(&input.to_string())
            }
            ra_domain::ContentBlock::ToolResult { output, .. } => count_tokens(output),
        })
        .sum::<usize>()
        + 4 // role + message framing overhead, fixed per message
}

pub fn count_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(count_message_tokens).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ra_domain::{ContentBlock, Message, Role};

    #[test]
    fn empty_text_has_zero_tokens() {
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn longer_text_has_more_tokens() {
        assert!(count_tokens("a somewhat longer piece of prose to estimate") > count_tokens("short"));
    }

    #[test]
    fn message_tokens_includes_framing_overhead() {
        let msg = Message::new(Role::User, vec![ContentBlock::text("hi")]);
        assert!(count_message_tokens(&msg) >= 4);
    }

    #[test]
    fn messages_tokens_sums_each_message() {
        let messages = vec![Message::user_text("one"), Message::user_text("two")];
        let total = count_messages_tokens(&messages);
        assert_eq!(total, count_message_tokens(&messages[0]) + count_message_tokens(&messages[1]));
    }
}
