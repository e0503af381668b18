//! Error types for the CLI application.

use compass_domain::{Classify, FailureKind};
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider could not be set up
    #[error("Provider error: {0}")]
    Provider(#[from] compass_llm::LlmError),

    /// Extractor could not be set up
    #[error("Extractor error: {0}")]
    Extractor(#[from] compass_extractor::ExtractorError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] compass_store::StoreError),

    /// Pipeline error
    #[error(transparent)]
    Pipeline(#[from] compass_orchestrator::OrchestratorError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Classify for CliError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            CliError::Config(_) | CliError::Toml(_) | CliError::InvalidInput(_) => {
                FailureKind::Configuration
            }
            CliError::Provider(e) => e.failure_kind(),
            CliError::Extractor(e) => e.failure_kind(),
            CliError::Store(e) => e.failure_kind(),
            CliError::Pipeline(e) => e.failure_kind(),
            CliError::Io(_) | CliError::Serialization(_) => FailureKind::Ingestion,
        }
    }
}
