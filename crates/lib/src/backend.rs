//! Seam between the chat UI and whatever produces assistant replies.
//!
//! Real LLM invocation lives in an external core and is out of scope here;
//! the desktop ships with a local placeholder so the chat loop is complete.

use anyhow::Result;

use crate::session::SessionMessage;

/// Produces one assistant reply for the given history. The last message is
/// the pending user turn.
pub trait AssistantBackend {
    fn complete(&self, messages: &[SessionMessage]) -> Result<String>;
}

/// Placeholder backend: acknowledges the last user message in Markdown.
pub struct LocalEchoBackend;

impl AssistantBackend for LocalEchoBackend {
    fn complete(&self, messages: &[SessionMessage]) -> Result<String> {
        let last = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("");
        Ok(format!(
            "No model backend is configured. You said:\n\n> {}\n\n\
             Set an API key under **Settings** to connect a model.",
            last
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_backend_quotes_last_user_message() {
        let history = vec![
            SessionMessage::user("first"),
            SessionMessage::assistant("ok"),
            SessionMessage::user("second"),
        ];
        let reply = LocalEchoBackend.complete(&history).expect("complete");
        assert!(reply.contains("> second"));
    }
}
