//! Per-session chat transcript.
//!
//! A [`Transcript`] is an ordered, append-only list of [`ChatMessage`]s that
//! starts with one assistant welcome message. It lives in memory only.

use serde::Serialize;

use crate::models::{ChatMessage, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new(welcome: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(welcome)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// True when the last turn is a user message with no reply yet.
    pub fn awaiting_reply(&self) -> bool {
        self.last().is_some_and(|m| m.role == Role::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_welcome() {
        let t = Transcript::new("Welcome");
        assert_eq!(t.messages(), &[ChatMessage::assistant("Welcome")]);
        assert!(!t.awaiting_reply());
    }

    #[test]
    fn test_turn_order() {
        let mut t = Transcript::new("Welcome");
        t.push_user("q1");
        assert!(t.awaiting_reply());
        t.push_assistant("a1");
        t.push_user("q2");
        let roles: Vec<Role> = t.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::Assistant, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(t.len(), 4);
        assert_eq!(t.last().unwrap().content, "q2");
    }
}
