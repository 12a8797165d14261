//! Gemini `generateContent` REST client.
//!
//! The model only produces text; prompts and parsing of its output live in
//! `ops`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::{GenerateRequest, GenerativeModel, LlmError, ResponseFormat};

/// Maximum number of characters of an upstream error body kept in errors.
const MAX_ERROR_BODY_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout: Duration,
}

pub struct GeminiClient {
    client: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    fn build_body(&self, request: &GenerateRequest) -> Value {
        let mut generation_config = json!({ "temperature": self.settings.temperature });
        if request.response_format == ResponseFormat::Json {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let mut body = json!({
            "contents":         request.contents,
            "generationConfig": generation_config,
        });

        if let Some(system) = &request.system_instruction {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        body
    }

    async fn post(&self, body: &Value) -> Result<Value, LlmError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingApiKey)?;

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Value>().await?);
        }

        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "(unreadable body)".to_string());
        Err(LlmError::Api {
            status: status.as_u16(),
            body: truncate_body(&error_body),
        })
    }

    /// Joins the text parts of the first candidate.
    fn parse_response(json: &Value) -> Result<String, LlmError> {
        let candidate = json
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or(LlmError::EmptyResponse)?;

        let text = candidate
            .pointer("/content/parts")
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model_id(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
        let body = self.build_body(&request);
        debug!(
            "Sending {} turn(s) to {}",
            request.contents.len(),
            self.settings.model
        );
        let raw = self.post(&body).await?;
        Self::parse_response(&raw)
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LEN {
        let truncated: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
        format!("{}...[truncated]", truncated)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Content, Role};

    fn client(api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(GeminiSettings {
            api_key: api_key.map(str::to_string),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/".to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        assert_eq!(
            client(None).endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn body_carries_history_and_system_instruction() {
        let request = GenerateRequest::conversation(
            vec![
                Content::user("a cafe here?"),
                Content::new(Role::Model, "tell me more"),
                Content::user("open late"),
            ],
            "You are an auditor",
        );
        let body = client(None).build_body(&request);

        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "open late");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are an auditor");
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn json_requests_ask_for_structured_output() {
        let body = client(None).build_body(&GenerateRequest::json_prompt("analyse"));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn parse_joins_candidate_parts() {
        let json = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello " }, { "text": "there" }] }
            }]
        });
        assert_eq!(GeminiClient::parse_response(&json).unwrap(), "Hello there");
    }

    #[test]
    fn parse_without_candidates_is_an_error() {
        let err = GeminiClient::parse_response(&json!({ "promptFeedback": {} })).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[test]
    fn candidate_without_parts_yields_empty_text() {
        let json = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert_eq!(GeminiClient::parse_response(&json).unwrap(), "");
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(500);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("...[truncated]"));
        assert!(truncated.len() < 250);
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_sending() {
        let err = client(None)
            .generate(GenerateRequest::json_prompt("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }
}
