//! Directory loader
//!
//! Enumerates a directory, extracts text from every supported file through a
//! [`TextSource`], and emits one [`RawDocument`] per file. A missing directory
//! fails the whole load; a bad file only fails itself.

use crate::IngestError;
use compass_domain::traits::TextSource;
use compass_domain::{Classify, DocumentFailure, RawDocument, Stage};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of loading one directory
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Documents with non-empty text, in path order
    pub documents: Vec<RawDocument>,

    /// Files that could not be read or produced no text
    pub failures: Vec<DocumentFailure>,

    /// Files no text source handles
    pub skipped: Vec<PathBuf>,
}

impl LoadReport {
    /// Number of files looked at
    pub fn files_seen(&self) -> usize {
        self.documents.len() + self.failures.len() + self.skipped.len()
    }
}

/// Loads source files into raw documents
pub struct DocumentLoader<S: TextSource> {
    source: S,
}

impl<S: TextSource> DocumentLoader<S> {
    /// Create a loader backed by `source`
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Load every supported file directly inside `dir`
    pub async fn load_dir(&self, dir: &Path) -> Result<LoadReport, IngestError> {
        if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
            return Err(IngestError::NotFound(dir.to_path_buf()));
        }

        let mut entries = tokio::fs::read_dir(dir).await.map_err(|source| IngestError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|source| IngestError::Io {
            path: dir.to_path_buf(),
            source,
        })? {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut report = LoadReport::default();
        for path in paths {
            if !self.source.supports(&path) {
                debug!(file = %path.display(), "Skipping unsupported file");
                report.skipped.push(path);
                continue;
            }

            match self.load_file(&path).await {
                Ok(doc) => {
                    debug!(file = %path.display(), chars = doc.char_count, pages = doc.page_count, "Loaded");
                    report.documents.push(doc);
                }
                Err(e) => {
                    let failure = DocumentFailure::new(
                        path.display().to_string(),
                        Stage::Load,
                        e.failure_kind(),
                        e.to_string(),
                    );
                    warn!(file = %failure.file, stage = %failure.stage, error = %failure.message, "Dropping document");
                    report.failures.push(failure);
                }
            }
        }

        info!(
            dir = %dir.display(),
            loaded = report.documents.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "Load complete"
        );
        Ok(report)
    }

    /// Load a single file
    pub async fn load_file(&self, path: &Path) -> Result<RawDocument, IngestError> {
        if !self.source.supports(path) {
            return Err(IngestError::Unsupported(path.to_path_buf()));
        }

        let extracted = self
            .source
            .extract_text(path)
            .await
            .map_err(|e| IngestError::Source {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if extracted.text.trim().is_empty() {
            return Err(IngestError::Empty(path.to_path_buf()));
        }

        Ok(RawDocument::new(path, extracted.text, extracted.page_count))
    }
}
