//! Ollama Provider Implementation
//!
//! Integration with Ollama's local LLM API. Uses the `format` field of
//! `/api/generate` to constrain output to the extraction schema, and passes
//! temperature and output size through `options`.
//!
//! # Examples
//!
//! ```no_run
//! use compass_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", 120).unwrap();
//! ```

use crate::{error_for_status, error_for_transport, LlmError};
use async_trait::async_trait;
use compass_domain::traits::{GenerationRequest, LlmProvider};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'a serde_json::Value,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    done_reason: Option<String>,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `timeout_secs`: per-request timeout
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    /// Create a provider on the default local endpoint
    pub fn default_endpoint() -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS)
    }

    /// Endpoint this provider talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate_structured(&self, request: &GenerationRequest) -> Result<String, Self::Error> {
        let url = format!("{}/api/generate", self.endpoint);

        let body = OllamaGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            system: &request.system,
            stream: false,
            format: &request.schema,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_output_tokens,
            },
        };

        debug!(model = %request.model, prompt_chars = request.prompt.len(), "Calling Ollama");

        let response = self
            .client
            .post(&url)
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
            .json::<OllamaGenerateResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if parsed.done_reason.as_deref() == Some("length") {
            return Err(LlmError::InvalidResponse(
                "Output truncated at max_output_tokens".to_string(),
            ));
        }

        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "llama3".to_string(),
            system: "Extract".to_string(),
            prompt: "test".to_string(),
            schema: serde_json::json!({"type": "object"}),
            temperature: 0.0,
            max_output_tokens: 128,
        }
    }

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434/", 30).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:11434");
        assert_eq!(provider.timeout_secs, 30);
    }

    #[test]
    fn test_ollama_provider_default_endpoint() {
        let provider = OllamaProvider::default_endpoint().unwrap();
        assert_eq!(provider.endpoint(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_request_body_carries_schema_and_options() {
        let req = request();
        let body = OllamaGenerateRequest {
            model: &req.model,
            prompt: &req.prompt,
            system: &req.system,
            stream: false,
            format: &req.schema,
            options: OllamaOptions {
                temperature: req.temperature,
                num_predict: req.max_output_tokens,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["format"]["type"], "object");
        assert_eq!(json["options"]["num_predict"], 128);
        assert_eq!(json["stream"], false);
    }

    #[tokio::test]
    async fn test_ollama_error_handling() {
        // Invalid port triggers a transport error
        let provider = OllamaProvider::new("http://localhost:99999", 1).unwrap();

        let result = provider.generate_structured(&request()).await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }

    // Integration tests (requires running Ollama)
    #[tokio::test]
    #[ignore]
    async fn test_ollama_generate_integration() {
        let provider = OllamaProvider::default_endpoint().unwrap();
        let result = provider.generate_structured(&request()).await;
        if let Ok(response) = result {
            assert!(!response.is_empty());
        }
    }
}
