//! The chat transcript shared by every agent.
//!
//! The first turn is always the active agent's system prompt. History stores
//! what the user actually typed; agents that reshape input (retrieval
//! context, follow-up templates) only change the final message sent to the
//! model, via [`Conversation::request_with`].

use genai::chat::{ChatMessage, ChatRequest};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            turns: vec![Turn {
                role: Role::System,
                text: system_prompt.to_string(),
            }],
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns after the system prompt.
    pub fn history(&self) -> &[Turn] {
        &self.turns[1..]
    }

    pub fn system_prompt(&self) -> &str {
        &self.turns[0].text
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::User,
            text: text.into(),
        });
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::Assistant,
            text: text.into(),
        });
    }

    /// The latest turn, if it is an assistant reply. A new input arriving
    /// while this is `Some` is a follow-up.
    pub fn last_assistant(&self) -> Option<&str> {
        match self.turns.last() {
            Some(Turn {
                role: Role::Assistant,
                text,
            }) => Some(text),
            _ => None,
        }
    }

    /// Drop every turn and start again from `system_prompt`.
    pub fn reset(&mut self, system_prompt: &str) {
        *self = Self::new(system_prompt);
    }

    /// Build a request from the full history with `model_input` as the final
    /// user message.
    pub fn request_with(&self, model_input: &str) -> ChatRequest {
        let mut messages: Vec<ChatMessage> = self
            .turns
            .iter()
            .map(|turn| match turn.role {
                Role::System => ChatMessage::system(turn.text.as_str()),
                Role::User => ChatMessage::user(turn.text.as_str()),
                Role::Assistant => ChatMessage::assistant(turn.text.as_str()),
            })
            .collect();
        messages.push(ChatMessage::user(model_input));
        ChatRequest::new(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_the_system_prompt() {
        let c = Conversation::new("be brief");
        assert_eq!(c.turns().len(), 1);
        assert_eq!(c.system_prompt(), "be brief");
        assert!(c.history().is_empty());
        assert!(c.last_assistant().is_none());
    }

    #[test]
    fn follow_up_detection_tracks_the_last_turn() {
        let mut c = Conversation::new("sys");
        c.push_user("hi");
        assert!(c.last_assistant().is_none());
        c.push_assistant("hello");
        assert_eq!(c.last_assistant(), Some("hello"));
        c.push_user("again");
        assert!(c.last_assistant().is_none());
    }

    #[test]
    fn request_appends_reshaped_input() {
        let mut c = Conversation::new("sys");
        c.push_user("q1");
        c.push_assistant("a1");
        let req = c.request_with("Context: ...\nQuestion: q2");
        assert_eq!(req.messages.len(), 4);
        assert_eq!(
            req.messages.last().and_then(|m| m.content.first_text()),
            Some("Context: ...\nQuestion: q2")
        );
    }

    #[test]
    fn reset_keeps_only_the_new_prompt() {
        let mut c = Conversation::new("old");
        c.push_user("x");
        c.reset("new");
        assert_eq!(c.turns().len(), 1);
        assert_eq!(c.system_prompt(), "new");
    }
}
