//! Error types for orchestration

use compass_domain::{Classify, FailureKind};
use compass_ingest::IngestError;
use compass_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running the pipeline
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Loading the input failed as a whole
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Storage layer error outside any single document
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Stage artifact could not be written or read
    #[error("Artifact error at {}: {message}", path.display())]
    Artifact {
        /// Artifact path
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// A failure classified as fatal to the run stopped it
    #[error("Run aborted by {file}: {message}")]
    Aborted {
        /// File whose failure stopped the run
        file: String,
        /// Failure message
        message: String,
    },
}

impl OrchestratorError {
    pub(crate) fn artifact(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        OrchestratorError::Artifact {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl Classify for OrchestratorError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            OrchestratorError::Config(_) | OrchestratorError::Aborted { .. } => {
                FailureKind::Configuration
            }
            OrchestratorError::Ingest(e) => e.failure_kind(),
            OrchestratorError::Store(e) => e.failure_kind(),
            OrchestratorError::Artifact { .. } => FailureKind::Ingestion,
        }
    }
}
