//! Error types for the Extractor

use compass_domain::{Classify, FailureKind};
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractorError {
    /// Provider call failed
    #[error("Provider error ({kind}): {message}")]
    Provider {
        /// Class reported by the provider error
        kind: FailureKind,
        /// Provider error message
        message: String,
    },

    /// Call did not finish within the request timeout
    #[error("Extraction timed out after {0}s")]
    Timeout(u64),

    /// Every attempt failed with a retryable error
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Message of the final failure
        last: String,
    },

    /// Response did not match the schema
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    /// Document had no text to extract from
    #[error("Document text is empty")]
    EmptyText,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Classify for ExtractorError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            ExtractorError::Provider { kind, .. } => *kind,
            ExtractorError::Timeout(_) => FailureKind::Transient { rate_limited: false },
            ExtractorError::Exhausted { .. } | ExtractorError::InvalidFormat(_) => {
                FailureKind::TerminalExtraction
            }
            ExtractorError::EmptyText => FailureKind::Validation,
            ExtractorError::Config(_) => FailureKind::Configuration,
        }
    }
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::InvalidFormat(e.to_string())
    }
}
