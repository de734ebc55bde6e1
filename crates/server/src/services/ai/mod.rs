//! AI-assisted features.
//!
//! [`AiModel`] is the seam to the text-generation backend ([`GeminiClient`]
//! in production). [`AiService`] builds the Turkish prompts for each
//! feature, parses the answers into typed responses and falls back to a
//! deterministic answer whenever the model cannot help.

mod assistant;
mod gemini;
pub mod types;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use assistant::AiService;
pub use gemini::GeminiClient;

/// Errors from the AI backend.
#[derive(Debug, Error)]
pub enum AiError {
    /// No model is configured.
    #[error("AI model not configured")]
    NotConfigured,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The model returned no text.
    #[error("empty response from model")]
    EmptyResponse,

    /// The model's answer could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

/// A text-generation model.
#[async_trait]
pub trait AiModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Parse a JSON value out of model output.
///
/// Models often wrap JSON in Markdown fences or add a sentence around it,
/// so this strips fences and falls back to the outermost `{...}` span.
///
/// # Errors
///
/// Returns `AiError::Parse` if no span parses as `T`.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let trimmed = strip_fences(text.trim());

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => {
            let span = trimmed.get(start..=end).unwrap_or(trimmed);
            serde_json::from_str(span).map_err(|e| AiError::Parse(e.to_string()))
        }
        _ => Err(AiError::Parse("no JSON object in model output".to_string())),
    }
}

fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        intent: String,
    }

    #[test]
    fn test_plain_json() {
        let a: Answer = extract_json(r#"{"intent":"search"}"#).unwrap();
        assert_eq!(a.intent, "search");
    }

    #[test]
    fn test_fenced_json() {
        let a: Answer = extract_json("```json\n{\"intent\": \"order\"}\n```").unwrap();
        assert_eq!(a.intent, "order");

        let a: Answer = extract_json("```\n{\"intent\": \"browse\"}\n```").unwrap();
        assert_eq!(a.intent, "browse");
    }

    #[test]
    fn test_json_inside_prose() {
        let a: Answer =
            extract_json("İşte sonuç: {\"intent\": \"search\"} umarım yardımcı olur").unwrap();
        assert_eq!(a.intent, "search");
    }

    #[test]
    fn test_no_json() {
        let result: Result<Answer, _> = extract_json("Maalesef anlayamadım.");
        assert!(matches!(result, Err(AiError::Parse(_))));
    }
}
