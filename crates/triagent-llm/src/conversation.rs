//! Chat conversation sent to a backend.
//!
//! A conversation is local to one engine call and to one backend: it starts as
//! `[system, user]` and grows by an `(assistant, user)` pair per corrective retry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Start a conversation from a system prompt and a user prompt.
    ///
    /// An empty system prompt is omitted.
    pub fn new(system_prompt: &str, prompt: &str) -> Self {
        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage::system(system_prompt));
        }
        messages.push(ChatMessage::user(prompt));
        Self { messages }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
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

    /// Flatten into a single prompt for completion-style backends that do not
    /// accept role-tagged messages.
    pub fn to_prompt_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| match m.role {
                Role::System | Role::User => m.content.clone(),
                Role::Assistant => format!("Previous response:\n{}", m.content),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
