//! Gemini Provider Implementation
//!
//! Calls the `generateContent` endpoint with `responseMimeType` set to JSON
//! and the extraction schema as `responseSchema`.

use crate::{error_for_status, error_for_transport, LlmError};
use async_trait::async_trait;
use compass_domain::traits::{GenerationRequest, LlmProvider};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default Gemini API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Google Gemini provider
pub struct GeminiProvider {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
    response_schema: &'a Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiProvider {
    /// Create a provider with an explicit API key
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Authentication("API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            client,
            timeout_secs,
        })
    }

    /// Create a provider with the key from `GEMINI_API_KEY`
    pub fn from_env(timeout_secs: u64) -> Result<Self, LlmError> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| LlmError::Authentication(format!("{} is not set", API_KEY_ENV)))?;
        Self::new(key, timeout_secs)
    }

    /// Point the provider at a different endpoint (proxies, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn build_body<'a>(request: &'a GenerationRequest) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                response_mime_type: "application/json",
                response_schema: &request.schema,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_structured(&self, request: &GenerationRequest) -> Result<String, Self::Error> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, request.model);
        let body = Self::build_body(request);

        debug!(model = %request.model, prompt_chars = request.prompt.len(), "Calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| error_for_transport(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(error_for_status(status, error_text, &request.model));
        }

        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        extract_text(parsed)
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, LlmError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No candidates in response".to_string()))?;

    if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
        return Err(LlmError::InvalidResponse(
            "Output truncated at max_output_tokens".to_string(),
        ));
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::InvalidResponse(format!(
            "Empty response (finish reason: {})",
            candidate.finish_reason.unwrap_or_else(|| "unknown".to_string())
        )));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_configuration_error() {
        let result = GeminiProvider::new("  ", 30);
        assert!(matches!(result, Err(LlmError::Authentication(_))));
    }

    #[test]
    fn test_body_shape() {
        let request = GenerationRequest {
            model: "gemini-2.0-flash".to_string(),
            system: "You extract plans".to_string(),
            prompt: "Plan text".to_string(),
            schema: serde_json::json!({"type": "object"}),
            temperature: 0.0,
            max_output_tokens: 8192,
        };
        let json = serde_json::to_value(GeminiProvider::build_body(&request)).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "You extract plans");
        assert!(json["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}, "finishReason": "STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_extract_text_rejects_truncation() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{"}]}, "finishReason": "MAX_TOKENS"}]}"#,
        )
        .unwrap();
        assert!(matches!(extract_text(response), Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_extract_text_no_candidates() {
        let response: GenerateContentResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(extract_text(response).is_err());
    }
}
