//! Failure taxonomy shared by every stage
//!
//! Each crate keeps its own error enum; [`Classify`] maps those errors onto
//! [`FailureKind`] so the orchestrator can decide between retrying, dropping
//! one document, or aborting the run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of a failure, deciding how far it propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unreadable or corrupt source; the document is dropped
    Ingestion,

    /// Empty content or schema mismatch; the document is dropped
    Validation,

    /// Timeout or throttling from the extraction service; retried
    Transient {
        /// Throttling signal, backed off more steeply
        rate_limited: bool,
    },

    /// Retries exhausted or structurally invalid response; fatal to the document
    TerminalExtraction,

    /// Transactional write failed and was rolled back; fatal to the document
    Persistence,

    /// Missing credentials or settings; fatal to the whole run
    Configuration,
}

impl FailureKind {
    /// Whether the retry policy should try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Transient { .. })
    }

    /// Whether this failure stops the whole run
    ///
    /// # Examples
    ///
    /// ```
    /// use compass_domain::FailureKind;
    ///
    /// assert!(FailureKind::Configuration.aborts_run());
    /// assert!(!FailureKind::Persistence.aborts_run());
    /// ```
    pub fn aborts_run(&self) -> bool {
        matches!(self, FailureKind::Configuration)
    }

    /// Short label for logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Ingestion => "ingestion",
            FailureKind::Validation => "validation",
            FailureKind::Transient { rate_limited: true } => "rate_limited",
            FailureKind::Transient { rate_limited: false } => "transient",
            FailureKind::TerminalExtraction => "terminal_extraction",
            FailureKind::Persistence => "persistence",
            FailureKind::Configuration => "configuration",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a crate-specific error onto the shared taxonomy
pub trait Classify {
    /// Class of this error
    fn failure_kind(&self) -> FailureKind;
}

/// Pipeline stage a document was in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Reading and text extraction
    Load,
    /// Boilerplate removal and normalization
    Clean,
    /// Schema extraction call
    Extract,
    /// Relational write
    Persist,
}

impl Stage {
    /// Short label for logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Clean => "clean",
            Stage::Extract => "extract",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of one document, with enough context to re-run just that file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFailure {
    /// Source file path
    pub file: String,
    /// Stage that failed
    pub stage: Stage,
    /// Failure class
    pub kind: FailureKind,
    /// Error message
    pub message: String,
}

impl DocumentFailure {
    /// Create a failure record
    pub fn new(file: impl Into<String>, stage: Stage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            stage,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for DocumentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}/{}]: {}", self.file, self.stage, self.kind, self.message)
    }
}
