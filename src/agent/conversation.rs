//! Conversation state for one thread
//!
//! An append-only message sequence. Nothing is ever truncated or reordered:
//! replaying the sequence reproduces exactly what the model saw.

use serde::{Deserialize, Serialize};

use crate::core::{Message, Role, ToolCall};

/// Ordered message history of one thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    thread_id: String,
    messages: Vec<Message>,
}

impl ConversationState {
    /// Empty state for a thread with no checkpoints
    pub fn empty(thread_id: impl Into<String>) -> Self {
        Self::from_messages(thread_id, Vec::new())
    }

    /// State restored from a persisted message sequence
    pub fn from_messages(thread_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Append one message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a batch, preserving its order
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// Messages appended at or after `index`
    pub fn since(&self, index: usize) -> &[Message] {
        &self.messages[index.min(self.messages.len())..]
    }

    /// Tool calls still waiting for results: those of the last message, if it
    /// is an assistant message
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        match self.messages.last() {
            Some(msg) if msg.role() == Role::Assistant => msg.tool_calls(),
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_is_concatenation() {
        let mut state = ConversationState::empty("t");
        state.push(Message::user("1"));
        state.extend(vec![Message::assistant("2"), Message::user("3")]);

        let contents: Vec<&str> = state.messages().iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_since_clamps() {
        let state = ConversationState::from_messages("t", vec![Message::user("a")]);
        assert_eq!(state.since(0).len(), 1);
        assert!(state.since(1).is_empty());
        assert!(state.since(10).is_empty());
    }

    #[test]
    fn test_pending_tool_calls() {
        let call = ToolCall::new("c1", "calculator", json!({}));
        let mut state = ConversationState::empty("t");
        state.push(Message::user("2 plus 2"));
        assert!(state.pending_tool_calls().is_empty());

        state.push(Message::assistant_with_tools("", vec![call.clone()]));
        assert_eq!(state.pending_tool_calls(), &[call]);
    }

    #[test]
    fn test_no_history_limit() {
        let mut state = ConversationState::empty("t");
        for i in 0..500 {
            state.push(Message::user(i.to_string()));
        }
        assert_eq!(state.len(), 500);
        assert_eq!(state.messages()[0].content(), "0");
    }
}
