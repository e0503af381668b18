//! Compass Ingest
//!
//! The first two pipeline stages: loading source files into
//! [`RawDocument`](compass_domain::RawDocument)s and cleaning them into
//! [`CleanedDocument`](compass_domain::CleanedDocument)s.
//!
//! # Architecture
//!
//! ```text
//! directory → DocumentLoader (TextSource) → RawDocument → TextCleaner → CleanedDocument
//! ```
//!
//! Text extraction from binary formats is delegated to a
//! [`TextSource`](compass_domain::traits::TextSource); [`PlainTextSource`]
//! covers plain-text and script-like files.
//!
//! # Example
//!
//! ```no_run
//! use compass_ingest::{CleanerConfig, DocumentLoader, PlainTextSource, TextCleaner};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), compass_ingest::IngestError> {
//! let loader = DocumentLoader::new(PlainTextSource::new());
//! let report = loader.load_dir(Path::new("plans/")).await?;
//!
//! let cleaner = TextCleaner::new(CleanerConfig::default());
//! for raw in &report.documents {
//!     let cleaned = cleaner.clean(raw);
//!     println!("{}: -{:.1}%", raw.title, cleaned.reduction_stats.reduction_pct);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod cleaner;
mod hints;
mod loader;
mod source;

pub use cleaner::{CleanerConfig, TextCleaner};
pub use hints::{annotate, HintError};
pub use loader::{DocumentLoader, LoadReport};
pub use source::{PlainTextSource, SUPPORTED_EXTENSIONS};

use compass_domain::{Classify, FailureKind};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading source documents
#[derive(Error, Debug)]
pub enum IngestError {
    /// Input directory does not exist
    #[error("Input directory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File or directory being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File bytes are not valid text
    #[error("Corrupt or non-text content in {}", .0.display())]
    Corrupt(PathBuf),

    /// No text source handles this file type
    #[error("Unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),

    /// Extraction produced no text
    #[error("No text extracted from {}", .0.display())]
    Empty(PathBuf),

    /// Error from a pluggable text source
    #[error("Text extraction failed for {}: {message}", path.display())]
    Source {
        /// File being extracted
        path: PathBuf,
        /// Source error message
        message: String,
    },
}

impl Classify for IngestError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            // A missing input directory is a bad run setting
            IngestError::NotFound(_) => FailureKind::Configuration,
            IngestError::Empty(_) => FailureKind::Validation,
            IngestError::Io { .. }
            | IngestError::Corrupt(_)
            | IngestError::Unsupported(_)
            | IngestError::Source { .. } => FailureKind::Ingestion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(IngestError::NotFound(PathBuf::from("x")).failure_kind().aborts_run());
        assert_eq!(
            IngestError::Empty(PathBuf::from("a.txt")).failure_kind(),
            FailureKind::Validation
        );
        assert_eq!(
            IngestError::Corrupt(PathBuf::from("a.txt")).failure_kind(),
            FailureKind::Ingestion
        );
    }

    #[test]
    fn test_error_messages_name_the_file() {
        let err = IngestError::Corrupt(PathBuf::from("plans/q1.txt"));
        assert!(err.to_string().contains("plans/q1.txt"));
    }
}
