pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use gemini::GeminiClient;

// ── Conversation content ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Anything other than `"model"` is authored by the user.
    pub fn from_wire(role: &str) -> Self {
        if role == "model" { Role::Model } else { Role::User }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// One single-author turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Concatenated text of all parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

// ── Requests ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Provider-native structured output (`application/json`).
    Json,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    pub response_format: ResponseFormat,
}

impl GenerateRequest {
    pub fn conversation(
        contents: Vec<Content>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            contents,
            system_instruction: Some(system_instruction.into()),
            response_format: ResponseFormat::Text,
        }
    }

    pub fn json_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            response_format: ResponseFormat::Json,
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Model returned no candidates")]
    EmptyResponse,

    #[error("Model API key is not configured")]
    MissingApiKey,
}

// ── Model seam ───────────────────────────────────────────────────────

/// A hosted generative model. Built once at start-up and shared read-only
/// between requests.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn model_id(&self) -> &str;

    /// Returns the model's text output for the request.
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError>;
}
