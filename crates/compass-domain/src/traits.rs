//! Trait definitions for external capabilities
//!
//! These traits define the boundaries between pipeline logic and
//! infrastructure. Implementations live in other crates, and tests swap in
//! doubles.

use crate::failure::Classify;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// Plain text pulled out of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// The text
    pub text: String,
    /// Pages or segments the text spans
    pub page_count: usize,
}

/// Capability that turns a source file into plain text
///
/// Implemented by the ingest layer for plain-text formats; binary formats plug
/// in here.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Error type for extraction failures
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether this source can read the file at `path`
    fn supports(&self, path: &Path) -> bool;

    /// Extract text from the file at `path`
    async fn extract_text(&self, path: &Path) -> Result<ExtractedText, Self::Error>;
}

/// Parameters of one schema-constrained generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Model identifier
    pub model: String,
    /// System instruction
    pub system: String,
    /// User prompt carrying the document text
    pub prompt: String,
    /// JSON Schema the response must follow
    pub schema: Value,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output size in tokens
    pub max_output_tokens: u32,
}

/// Trait for generative-text providers
///
/// Implemented by the infrastructure layer (compass-llm). One call maps to one
/// request on the wire; retrying is the caller's concern.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Error type for provider operations
    type Error: std::error::Error + Classify + Send + Sync + 'static;

    /// Provider name for logs
    fn name(&self) -> &str;

    /// Generate a JSON document that follows `request.schema`
    async fn generate_structured(&self, request: &GenerationRequest) -> Result<String, Self::Error>;
}
