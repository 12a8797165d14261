//! Structured output recovered from free model text.
//!
//! All regex handling of model output lives here so callers only see an
//! explicit parsed-or-fallback result.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A ```` ```json ```` fenced block; group 1 is the body.
static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json[ \t]*\r?\n(.*?)\r?\n[ \t]*```").expect("valid json fence regex")
});

/// A stray top-level object mentioning `"map_action"`. Greedy on purpose so
/// nested braces are swallowed with it, along with any prose that follows an
/// earlier `{` in the same reply.
static STRAY_ACTION_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\{.*"map_action".*\}"#).expect("valid action object regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// No fenced block in the text.
    Missing,
    /// A block was found but did not parse into the expected shape.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Parsed(T),
    Fallback { value: T, reason: FallbackReason },
}

impl<T> Extraction<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Extraction::Parsed(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Extraction::Parsed(v) | Extraction::Fallback { value: v, .. } => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Extraction::Parsed(v) | Extraction::Fallback { value: v, .. } => v,
        }
    }
}

/// Body of the first fenced JSON block, if any.
pub fn first_fenced_json(text: &str) -> Option<&str> {
    JSON_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Parse the first fenced block into `T`, or fall back to `fallback()`.
pub fn extract_fenced<T, F>(text: &str, fallback: F) -> Extraction<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    let Some(body) = first_fenced_json(text) else {
        return Extraction::Fallback {
            value: fallback(),
            reason: FallbackReason::Missing,
        };
    };

    match serde_json::from_str::<T>(body) {
        Ok(value) => Extraction::Parsed(value),
        Err(e) => Extraction::Fallback {
            value: fallback(),
            reason: FallbackReason::Invalid(e.to_string()),
        },
    }
}

/// Display text with every fenced JSON block and any stray action object
/// removed.
pub fn strip_action_json(text: &str) -> String {
    let without_fences = JSON_FENCE.replace_all(text, "");
    STRAY_ACTION_OBJECT
        .replace_all(&without_fences, "")
        .trim()
        .to_string()
}

/// Parse a reply that should be a bare JSON document. If the model wrapped
/// it in a markdown fence anyway, unwrap the fence and try once more.
pub fn parse_json_document(text: &str) -> Result<Value, serde_json::Error> {
    match serde_json::from_str::<Value>(text) {
        Ok(v) => Ok(v),
        Err(_) => {
            let unwrapped = JSON_FENCE.replace_all(text, "$1");
            serde_json::from_str::<Value>(unwrapped.trim())
        }
    }
}
