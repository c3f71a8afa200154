//! Conversation messages and the append-ordered history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The customer.
    User,
    /// The engine / planner.
    Assistant,
    /// A backend tool result, recorded for audit.
    Tool,
}

/// A single message in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub role: Role,
    /// Message text. For `Role::Tool` this is the tagged result string.
    pub text: String,
    /// When the message was appended.
    pub at: DateTime<Utc>,
}

impl Message {
    /// A user message stamped now.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// An assistant message stamped now.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// A tool-result message stamped now.
    #[must_use]
    pub fn tool(text: impl Into<String>) -> Self {
        Self::new(Role::Tool, text)
    }

    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Append-ordered message history.
///
/// Messages are appended by turn completion and never reordered, even when
/// tool calls inside a turn finish out of order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    /// An empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent `max` messages, oldest first.
    ///
    /// The planner never sees unbounded history; this is the trim applied
    /// before every planner call.
    #[must_use]
    pub fn trimmed(&self, max: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(max);
        &self.messages[start..]
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_order() {
        let mut history = History::new();
        history.push(Message::user("a"));
        history.push(Message::assistant("b"));
        history.push(Message::user("c"));

        let texts: Vec<&str> = history.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[test]
    fn trimmed_keeps_most_recent() {
        let mut history = History::new();
        for i in 0..10 {
            history.push(Message::user(format!("m{i}")));
        }
        let tail = history.trimmed(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].text, "m7");
        assert_eq!(tail[2].text, "m9");
    }

    #[test]
    fn trimmed_shorter_than_max_returns_all() {
        let mut history = History::new();
        history.push(Message::user("only"));
        assert_eq!(history.trimmed(20).len(), 1);
    }

    #[test]
    fn serde_round_trip() {
        let mut history = History::new();
        history.push(Message::tool("SUCCESS: booking created"));
        let json = serde_json::to_string(&history).unwrap();
        let back: History = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }
}
