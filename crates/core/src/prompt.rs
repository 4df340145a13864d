//! Prompt assembly — flattens a conversation into a single completion prompt.
//!
//! Each message renders as `"<Label>: <content>\n\n"` and the prompt always
//! ends with the `"Assistant: "` cue. Messages whose role has no label are
//! skipped rather than rejected.

use tracing::debug;

use crate::message::Message;

/// Appended after the last message to cue the assistant's turn.
pub const ASSISTANT_CUE: &str = "Assistant: ";

/// Render `messages` in order into a single prompt.
pub fn assemble(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for msg in messages {
        let Some(label) = msg.role.prompt_label() else {
            debug!(role = %msg.role, "Skipping message with unrecognized role");
            continue;
        };
        prompt.push_str(label);
        prompt.push_str(": ");
        prompt.push_str(&msg.content);
        prompt.push_str("\n\n");
    }
    prompt.push_str(ASSISTANT_CUE);
    prompt
}
