//! Compass LLM Provider Layer
//!
//! Pluggable generative-text providers behind the `LlmProvider` trait from
//! `compass-domain`, plus the reusable retry/backoff wrapper used around any
//! fallible external call.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic scripted provider for testing
//! - `OllamaProvider`: Local Ollama API with JSON-schema constrained output
//! - `GeminiProvider`: Google Gemini `generateContent` with a response schema
//!
//! Providers issue exactly one request per call. Retrying belongs to
//! [`retry::retry_with_backoff`], which callers wrap around the provider.
//!
//! # Examples
//!
//! ```
//! use compass_domain::traits::{GenerationRequest, LlmProvider};
//! use compass_llm::MockProvider;
//!
//! # async fn example() {
//! let provider = MockProvider::new(r#"{"planTitle": "FY25"}"#);
//! let request = GenerationRequest {
//!     model: "mock".to_string(),
//!     system: String::new(),
//!     prompt: "extract".to_string(),
//!     schema: serde_json::json!({}),
//!     temperature: 0.0,
//!     max_output_tokens: 1024,
//! };
//! let result = provider.generate_structured(&request).await.unwrap();
//! assert_eq!(result, r#"{"planTitle": "FY25"}"#);
//! # }
//! ```

#![warn(missing_docs)]

pub mod gemini;
pub mod mock;
pub mod ollama;
pub mod retry;

use compass_domain::{Classify, FailureKind};
use thiserror::Error;

pub use gemini::GeminiProvider;
pub use mock::{MockOutcome, MockProvider};
pub use ollama::OllamaProvider;
pub use retry::{retry_with_backoff, RetryClass, RetryError, RetryPolicy};

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Request did not complete in time
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Missing or rejected credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Request rejected by the service (non-retryable client error)
    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl Classify for LlmError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            LlmError::RateLimitExceeded => FailureKind::Transient { rate_limited: true },
            LlmError::Communication(_) | LlmError::Timeout(_) => {
                FailureKind::Transient { rate_limited: false }
            }
            LlmError::Authentication(_) => FailureKind::Configuration,
            LlmError::InvalidResponse(_)
            | LlmError::ModelNotAvailable(_)
            | LlmError::Rejected { .. }
            | LlmError::Other(_) => FailureKind::TerminalExtraction,
        }
    }
}

/// Map a non-success HTTP status onto an error
pub(crate) fn error_for_status(status: reqwest::StatusCode, body: String, model: &str) -> LlmError {
    match status.as_u16() {
        429 => LlmError::RateLimitExceeded,
        401 | 403 => LlmError::Authentication(body),
        404 => LlmError::ModelNotAvailable(model.to_string()),
        408 => LlmError::Communication(format!("HTTP 408: {}", body)),
        code if status.is_server_error() => {
            LlmError::Communication(format!("HTTP {}: {}", code, body))
        }
        code => LlmError::Rejected {
            status: code,
            message: body,
        },
    }
}

/// Map a transport-level reqwest error onto an error
pub(crate) fn error_for_transport(e: reqwest::Error, timeout_secs: u64) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout_secs)
    } else {
        LlmError::Communication(format!("Request failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, String::new(), "m"),
            LlmError::RateLimitExceeded
        ));
        assert!(matches!(
            error_for_status(StatusCode::SERVICE_UNAVAILABLE, "busy".into(), "m"),
            LlmError::Communication(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, "bad key".into(), "m"),
            LlmError::Authentication(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, String::new(), "llama3"),
            LlmError::ModelNotAvailable(m) if m == "llama3"
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_REQUEST, "bad schema".into(), "m"),
            LlmError::Rejected { status: 400, .. }
        ));
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            LlmError::RateLimitExceeded.failure_kind(),
            FailureKind::Transient { rate_limited: true }
        );
        assert_eq!(
            LlmError::Timeout(30).failure_kind(),
            FailureKind::Transient { rate_limited: false }
        );
        assert_eq!(
            LlmError::InvalidResponse("x".into()).failure_kind(),
            FailureKind::TerminalExtraction
        );
        assert_eq!(
            LlmError::Authentication("x".into()).failure_kind(),
            FailureKind::Configuration
        );
    }
}
