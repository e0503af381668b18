//! Stage selection for one run
//!
//! The run modes decide which stages execute; each stage's contract is the
//! same in every mode.

use crate::artifacts::ArtifactStore;
use crate::error::OrchestratorError;
use crate::metrics::ProgressSnapshot;
use crate::orchestrator::BatchOrchestrator;
use compass_domain::traits::{LlmProvider, TextSource};
use compass_domain::{
    Classify, CleanedDocument, DocumentFailure, ExtractionResult, FailureKind, ProcessingStatus, Stage,
};
use compass_ingest::{DocumentLoader, TextCleaner};
use compass_store::{BatchImporter, ImportStats};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Stages a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Load, clean, extract and (optionally) persist
    Full,
    /// Load and clean, writing raw and cleaned artifacts
    CleanOnly,
    /// Import previously written processed artifacts
    ImportOnly,
}

/// Outcome of one run, whatever its mode
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Mode that ran
    pub mode: RunMode,

    /// Documents processed, failed, success rate and elapsed time
    pub summary: ProgressSnapshot,

    /// Unsupported files left alone
    pub skipped: Vec<PathBuf>,

    /// Every terminal failure, from any stage
    pub failures: Vec<DocumentFailure>,

    /// Import counters, when anything was imported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<ImportStats>,

    /// Output directory holding the stage artifacts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl RunReport {
    /// Whether every document made it through
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Documents ready for extraction
#[derive(Debug, Default)]
pub struct Prepared {
    /// Cleaned documents in load order
    pub documents: Vec<CleanedDocument>,
    /// Files that failed to load
    pub failures: Vec<DocumentFailure>,
    /// Unsupported files
    pub skipped: Vec<PathBuf>,
}

/// Runs the stages selected by a [`RunMode`]
pub struct Pipeline<S: TextSource> {
    loader: DocumentLoader<S>,
    cleaner: TextCleaner,
    artifacts: Option<ArtifactStore>,
}

impl<S: TextSource> Pipeline<S> {
    /// Create a pipeline; stage artifacts are only written when `artifacts` is set
    pub fn new(loader: DocumentLoader<S>, cleaner: TextCleaner, artifacts: Option<ArtifactStore>) -> Self {
        Self {
            loader,
            cleaner,
            artifacts,
        }
    }

    /// Artifact store, if any
    pub fn artifacts(&self) -> Option<&ArtifactStore> {
        self.artifacts.as_ref()
    }

    /// Load and clean every supported file under `input`
    ///
    /// A missing directory fails the whole call; everything else is a
    /// per-file failure. A document whose raw or cleaned artifact cannot be
    /// written fails at that stage and is not extracted.
    pub async fn prepare(&self, input: &Path) -> Result<Prepared, OrchestratorError> {
        let report = self.loader.load_dir(input).await?;
        let mut documents = Vec::with_capacity(report.documents.len());
        let mut failures = report.failures;

        for raw in &report.documents {
            let file = raw.source_ref().key();
            if let Some(artifacts) = &self.artifacts {
                if let Err(e) = artifacts.write_raw(raw).await {
                    failures.push(artifact_failure(&file, Stage::Load, e));
                    continue;
                }
            }
            let cleaned = self.cleaner.clean(raw);
            if let Some(artifacts) = &self.artifacts {
                if let Err(e) = artifacts.write_cleaned(&cleaned).await {
                    failures.push(artifact_failure(&file, Stage::Clean, e));
                    continue;
                }
            }
            documents.push(cleaned);
        }

        info!(
            loaded = documents.len(),
            failed = failures.len(),
            skipped = report.skipped.len(),
            "Prepared documents"
        );
        Ok(Prepared {
            documents,
            failures,
            skipped: report.skipped,
        })
    }

    /// Load, clean and write artifacts; no extraction
    pub async fn clean_only(&self, input: &Path) -> Result<RunReport, OrchestratorError> {
        let started = Instant::now();
        let prepared = self.prepare(input).await?;

        let failed = prepared.failures.len();
        let processed = prepared.documents.len() + failed;
        Ok(RunReport {
            mode: RunMode::CleanOnly,
            summary: ProgressSnapshot::new(processed, processed, failed, started.elapsed()),
            skipped: prepared.skipped,
            failures: prepared.failures,
            import: None,
            output_dir: self.output_dir(),
        })
    }

    /// Full run: load, clean, extract, persist when `importer` is given
    ///
    /// Processed artifacts are written for every extraction result. Load
    /// failures count towards `processed` and `failed` alongside extraction
    /// and persistence failures. A processed artifact that cannot be written
    /// is listed in `failures` without changing the counters.
    pub async fn run<P: LlmProvider + 'static>(
        &self,
        input: &Path,
        orchestrator: &BatchOrchestrator<P>,
        importer: Option<&mut BatchImporter>,
    ) -> Result<RunReport, OrchestratorError> {
        let started = Instant::now();
        let prepared = self.prepare(input).await?;
        let load_failures = prepared.failures.len();

        let batch = orchestrator.run(prepared.documents, importer).await;
        let mut artifact_failures = Vec::new();
        if let Some(artifacts) = &self.artifacts {
            for result in &batch.results {
                if let Err(e) = artifacts.write_processed(result).await {
                    let file = result.source_ref().key();
                    artifact_failures.push(artifact_failure(&file, Stage::Persist, e));
                }
            }
        }
        let batch = batch.into_result()?;

        let mut failures = prepared.failures;
        failures.extend(batch.failures);
        failures.extend(artifact_failures);

        Ok(RunReport {
            mode: RunMode::Full,
            summary: ProgressSnapshot::new(
                batch.progress.total + load_failures,
                batch.progress.processed + load_failures,
                batch.progress.failed + load_failures,
                started.elapsed(),
            ),
            skipped: prepared.skipped,
            failures,
            import: batch.import,
            output_dir: self.output_dir(),
        })
    }

    fn output_dir(&self) -> Option<PathBuf> {
        self.artifacts.as_ref().map(|a| a.root().to_path_buf())
    }
}

fn artifact_failure(file: &str, stage: Stage, err: OrchestratorError) -> DocumentFailure {
    warn!(file = %file, stage = %stage, error = %err, "Could not write artifact");
    DocumentFailure::new(file, stage, err.failure_kind(), err.to_string())
}

/// Re-import processed artifacts written by an earlier run
pub async fn import_only(
    artifacts: &ArtifactStore,
    importer: &mut BatchImporter,
) -> Result<RunReport, OrchestratorError> {
    let started = Instant::now();
    let read = artifacts.read_processed().await?;
    let unreadable = read.failures.len();

    let stats = importer.import_all(&read.results);
    let failures = record_import_failures(&read.results, importer, read.failures);

    let processed = read.results.len() + unreadable;
    Ok(RunReport {
        mode: RunMode::ImportOnly,
        summary: ProgressSnapshot::new(processed, processed, stats.failed + unreadable, started.elapsed()),
        skipped: Vec::new(),
        failures,
        import: Some(stats),
        output_dir: Some(artifacts.root().to_path_buf()),
    })
}

/// Failure entries for results that did not end up `completed`; error
/// results are also marked `failed` in the status ledger
fn record_import_failures(
    results: &[ExtractionResult],
    importer: &mut BatchImporter,
    mut failures: Vec<DocumentFailure>,
) -> Vec<DocumentFailure> {
    for result in results {
        let file = result.source_ref().key();
        if let Some(error) = result.error() {
            if let Err(e) = importer.store_mut().mark_failed(&file, error) {
                warn!(file = %file, error = %e, "Could not record failed status");
            }
            failures.push(DocumentFailure::new(file, Stage::Extract, FailureKind::TerminalExtraction, error));
            continue;
        }
        match importer.store().status(&file) {
            Ok(Some(record)) if record.status == ProcessingStatus::Completed => {}
            Ok(record) => {
                let message = record
                    .and_then(|r| r.error_message)
                    .unwrap_or_else(|| "Write failed".to_string());
                failures.push(DocumentFailure::new(file, Stage::Persist, FailureKind::Persistence, message));
            }
            Err(e) => warn!(file = %file, error = %e, "Could not read status"),
        }
    }
    failures
}
