//! Structured text generation through the Gemini API.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::AiConfig;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("No API key configured. Set GEMINI_API_KEY or ai.api_key in config.toml")]
    MissingApiKey,

    #[error("Request to the model failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Model responded with HTTP {0}")]
    HttpStatus(u16),

    #[error("Model response had no text")]
    EmptyResponse,

    #[error("Model response was not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Source of JSON documents generated from a prompt and a response schema.
pub trait TextGenerator {
    fn generate_json(&self, prompt: &str, schema: &Value) -> Result<Value, AiError>;
}

pub struct GeminiClient {
    http: Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

/// Text of the first candidate in a `generateContent` response.
fn first_candidate_text(response: &Value) -> Option<&str> {
    response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}

impl TextGenerator for GeminiClient {
    fn generate_json(&self, prompt: &str, schema: &Value) -> Result<Value, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }
        });

        log::debug!("requesting generation from {}", self.model);
        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()?;
        if !response.status().is_success() {
            return Err(AiError::HttpStatus(response.status().as_u16()));
        }

        let payload: Value = response.json()?;
        let text = first_candidate_text(&payload).ok_or(AiError::EmptyResponse)?;
        Ok(serde_json::from_str(text.trim())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_candidate_text() {
        let response = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "[\"a\", \"b\"]" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(first_candidate_text(&response), Some("[\"a\", \"b\"]"));
        assert_eq!(first_candidate_text(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn test_missing_api_key_fails_before_request() {
        let client = GeminiClient::new(&AiConfig::default()).unwrap();
        assert!(matches!(
            client.generate_json("prompt", &json!({})),
            Err(AiError::MissingApiKey)
        ));
    }
}
