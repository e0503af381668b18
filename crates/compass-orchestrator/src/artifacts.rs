//! Stage artifacts on disk
//!
//! Layout under the output directory, one JSON file per input file named by
//! its stem:
//!
//! ```text
//! <out>/raw/<stem>.json        RawDocument
//! <out>/cleaned/<stem>.json    CleanedDocument
//! <out>/processed/<stem>.json  ExtractionResult (payload or error)
//! ```
//!
//! Two inputs with the same stem (`a/plan.txt` and `b/plan.txt`, or
//! `plan.txt` and `plan.md`) share an artifact path. The later write wins
//! and the collision is logged and recorded.

use crate::error::OrchestratorError;
use compass_domain::{
    CleanedDocument, DocumentFailure, ExtractionResult, FailureKind, RawDocument, SourceRef, Stage,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tracing::{debug, warn};

/// Pipeline stage an artifact belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStage {
    /// Loaded text
    Raw,
    /// Cleaned text and hints
    Cleaned,
    /// Extraction result
    Processed,
}

impl ArtifactStage {
    fn dir_name(&self) -> &'static str {
        match self {
            ArtifactStage::Raw => "raw",
            ArtifactStage::Cleaned => "cleaned",
            ArtifactStage::Processed => "processed",
        }
    }
}

/// Two source files written to the same artifact path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCollision {
    /// Shared artifact path
    pub path: PathBuf,
    /// Source whose artifact was overwritten
    pub previous: String,
    /// Source written last
    pub file: String,
}

/// Reads and writes stage artifacts under one output directory
///
/// Clones share the record of which source wrote each path.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    written: Arc<Mutex<HashMap<PathBuf, String>>>,
    collisions: Arc<Mutex<Vec<ArtifactCollision>>>,
}

impl ArtifactStore {
    /// Artifacts rooted at `root`; directories are created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Arc::default(),
            collisions: Arc::default(),
        }
    }

    /// Paths written by more than one source since this store was created
    pub fn collisions(&self) -> Vec<ArtifactCollision> {
        self.collisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Output directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one stage's artifacts
    pub fn stage_dir(&self, stage: ArtifactStage) -> PathBuf {
        self.root.join(stage.dir_name())
    }

    /// Artifact path for a source document
    pub fn path_for(&self, stage: ArtifactStage, source: &SourceRef) -> PathBuf {
        self.stage_dir(stage).join(format!("{}.json", source.stem()))
    }

    /// Write a raw document
    pub async fn write_raw(&self, doc: &RawDocument) -> Result<PathBuf, OrchestratorError> {
        self.write(ArtifactStage::Raw, &doc.source_ref(), doc).await
    }

    /// Write a cleaned document
    pub async fn write_cleaned(&self, doc: &CleanedDocument) -> Result<PathBuf, OrchestratorError> {
        self.write(ArtifactStage::Cleaned, &doc.source_ref, doc).await
    }

    /// Write an extraction result
    pub async fn write_processed(&self, result: &ExtractionResult) -> Result<PathBuf, OrchestratorError> {
        self.write(ArtifactStage::Processed, result.source_ref(), result).await
    }

    async fn write<T: Serialize>(
        &self,
        stage: ArtifactStage,
        source: &SourceRef,
        value: &T,
    ) -> Result<PathBuf, OrchestratorError> {
        let dir = self.stage_dir(stage);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| OrchestratorError::artifact(&dir, e))?;

        let path = self.path_for(stage, source);
        self.claim(&path, source);
        let json = serde_json::to_string_pretty(value).map_err(|e| OrchestratorError::artifact(&path, e))?;
        fs::write(&path, json)
            .await
            .map_err(|e| OrchestratorError::artifact(&path, e))?;

        debug!(path = %path.display(), "Wrote artifact");
        Ok(path)
    }

    fn claim(&self, path: &Path, source: &SourceRef) {
        let file = source.key();
        let previous = self
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), file.clone());

        if let Some(previous) = previous.filter(|p| *p != file) {
            warn!(
                path = %path.display(),
                previous = %previous,
                file = %file,
                "Artifact name collision, overwriting"
            );
            self.collisions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(ArtifactCollision {
                    path: path.to_path_buf(),
                    previous,
                    file,
                });
        }
    }

    /// Read every processed artifact, sorted by file name
    ///
    /// Unreadable or malformed files become [`Stage::Persist`] failures and
    /// do not stop the rest. A missing `processed` directory is an error.
    pub async fn read_processed(&self) -> Result<ProcessedArtifacts, OrchestratorError> {
        let dir = self.stage_dir(ArtifactStage::Processed);
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| OrchestratorError::artifact(&dir, e))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| OrchestratorError::artifact(&dir, e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut artifacts = ProcessedArtifacts::default();
        for path in paths {
            let parsed = fs::read_to_string(&path)
                .await
                .map_err(|e| e.to_string())
                .and_then(|text| {
                    serde_json::from_str::<ExtractionResult>(&text).map_err(|e| e.to_string())
                });

            match parsed {
                Ok(result) => artifacts.results.push(result),
                Err(message) => {
                    warn!(file = %path.display(), stage = "persist", error = %message, "Unreadable artifact");
                    artifacts.failures.push(DocumentFailure::new(
                        path.display().to_string(),
                        Stage::Persist,
                        FailureKind::Validation,
                        message,
                    ));
                }
            }
        }
        Ok(artifacts)
    }
}

/// Processed artifacts read back from disk
#[derive(Debug, Clone, Default)]
pub struct ProcessedArtifacts {
    /// Parsed extraction results
    pub results: Vec<ExtractionResult>,
    /// Files that could not be read or parsed
    pub failures: Vec<DocumentFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_domain::ReductionStats;

    #[tokio::test]
    async fn test_layout_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let raw = RawDocument::new("in/fy25_plan.txt", "text", 1);
        let raw_path = store.write_raw(&raw).await.unwrap();
        assert_eq!(raw_path, dir.path().join("raw").join("fy25_plan.json"));

        let cleaned = CleanedDocument {
            source_ref: raw.source_ref(),
            cleaned_text: "text".to_string(),
            reduction_stats: ReductionStats::compute(4, 4),
            structural_hints: None,
        };
        store.write_cleaned(&cleaned).await.unwrap();
        assert!(dir.path().join("cleaned").join("fy25_plan.json").exists());

        let result = ExtractionResult::failure(raw.source_ref(), "retries exhausted");
        store.write_processed(&result).await.unwrap();

        let read = store.read_processed().await.unwrap();
        assert_eq!(read.results, vec![result]);
        assert!(read.failures.is_empty());
    }

    #[tokio::test]
    async fn test_same_stem_collision_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let first = RawDocument::new("east/plan.txt", "east", 1);
        let second = RawDocument::new("west/plan.md", "west", 1);
        store.write_raw(&first).await.unwrap();
        store.write_raw(&first).await.unwrap();
        assert!(store.collisions().is_empty());

        let path = store.clone().write_raw(&second).await.unwrap();
        assert_eq!(
            store.collisions(),
            vec![ArtifactCollision {
                path: path.clone(),
                previous: "east/plan.txt".to_string(),
                file: "west/plan.md".to_string(),
            }]
        );

        // Later write wins
        let written: RawDocument = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.raw_text, "west");
    }

    #[tokio::test]
    async fn test_malformed_artifact_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let processed = dir.path().join("processed");
        std::fs::create_dir_all(&processed).unwrap();
        std::fs::write(processed.join("bad.json"), "{not json").unwrap();
        std::fs::write(processed.join("notes.txt"), "ignored").unwrap();

        let read = ArtifactStore::new(dir.path()).read_processed().await.unwrap();
        assert!(read.results.is_empty());
        assert_eq!(read.failures.len(), 1);
        assert!(read.failures[0].file.ends_with("bad.json"));
    }

    #[tokio::test]
    async fn test_missing_processed_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ArtifactStore::new(dir.path()).read_processed().await;
        assert!(matches!(result, Err(OrchestratorError::Artifact { .. })));
    }
}
