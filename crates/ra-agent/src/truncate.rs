//! Context-window truncation: keep the most recent messages while never
//! splitting a `tool_use`/`tool_result` pair across the cut.

use ra_domain::Message;

/// Keeps the last `max_messages` messages, extending the window backward
/// one message at a time while its first entry is a `tool_result` — that
/// would otherwise reference a `tool_use` id that fell outside the window.
pub fn truncate_messages(messages: &[Message], max_messages: usize) -> (Vec<Message>, bool, usize) {
    if messages.len() <= max_messages {
        return (messages.to_vec(), false, 0);
    }

    let mut start = messages.len() - max_messages;
    while start > 0 && messages[start].tool_result_ids().next().is_some() {
        start -= 1;
    }

    (messages[start..].to_vec(), start > 0, start)
}
