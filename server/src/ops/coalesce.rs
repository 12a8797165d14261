use serde::Deserialize;
use thiserror::Error;

use crate::llm::{Content, Role};

/// A chat message as sent by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ChatMessage {
    pub fn new(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            text: Some(text.to_string()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoalesceError {
    /// Nothing new from the user to respond to.
    #[error("Waiting for user input...")]
    InvalidState,
}

/// Merged conversation ready for the model: prior turns plus the final
/// user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub history: Vec<Content>,
    pub final_prompt: String,
}

impl Conversation {
    /// History followed by the final prompt as a user turn.
    pub fn into_contents(self) -> Vec<Content> {
        let mut contents = self.history;
        contents.push(Content::user(self.final_prompt));
        contents
    }
}

/// Merge a flat message list into strictly alternating turns.
///
/// Model messages before the first user message are dropped, and runs of
/// same-role messages are joined with newlines. The last turn must be the
/// user's.
pub fn coalesce(messages: &[ChatMessage]) -> Result<Conversation, CoalesceError> {
    let mut turns: Vec<(Role, String)> = Vec::new();
    let mut current: Option<(Role, String)> = None;

    for msg in messages {
        let role = Role::from_wire(msg.role.as_deref().unwrap_or(""));
        let text = msg.text.as_deref().unwrap_or("");

        if turns.is_empty() && current.is_none() && role == Role::Model {
            continue;
        }

        match current {
            Some((cur_role, ref mut cur_text)) if cur_role == role => {
                cur_text.push('\n');
                cur_text.push_str(text);
            }
            _ => {
                if let Some(done) = current.take() {
                    turns.push(done);
                }
                current = Some((role, text.to_string()));
            }
        }
    }

    // A trailing run with no text is not a turn
    if let Some((role, text)) = current {
        if !text.is_empty() {
            turns.push((role, text));
        }
    }

    match turns.pop() {
        Some((Role::User, final_prompt)) => Ok(Conversation {
            history: turns
                .into_iter()
                .map(|(role, text)| Content::new(role, text))
                .collect(),
            final_prompt,
        }),
        _ => Err(CoalesceError::InvalidState),
    }
}
