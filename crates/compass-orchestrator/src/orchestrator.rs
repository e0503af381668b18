//! Bounded-concurrency batch extraction
//!
//! Every document is extracted by its own task, but a semaphore with
//! `concurrency` permits gates the provider call, so at most that many calls
//! are in flight at any instant. Results are settled on the calling task as
//! they complete: successes go to the importer, failures are recorded, and no
//! failure cancels or delays a sibling.

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::metrics::{BatchProgress, ProgressSnapshot};
use compass_domain::traits::LlmProvider;
use compass_domain::{
    Classify, CleanedDocument, DocumentFailure, ExtractionResult, ExtractionSchema, FailureKind,
    SourceRef, Stage,
};
use compass_extractor::{ExtractorError, SchemaExtractor};
use compass_store::{BatchImporter, ImportStats};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Outcome of one batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Final counters
    pub progress: ProgressSnapshot,

    /// Documents that reached their terminal successful state: persisted, or
    /// extracted when persistence is off
    pub persisted: Vec<SourceRef>,

    /// Every terminal failure with file, stage and message
    pub failures: Vec<DocumentFailure>,

    /// Import counters, when persistence ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<ImportStats>,

    /// Failure that stopped the run, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<DocumentFailure>,

    /// Every extraction result, in completion order
    #[serde(skip)]
    pub results: Vec<ExtractionResult>,
}

impl BatchSummary {
    /// Turn an aborted batch into an error
    pub fn into_result(self) -> Result<Self, OrchestratorError> {
        match &self.aborted {
            Some(failure) => Err(OrchestratorError::Aborted {
                file: failure.file.clone(),
                message: failure.message.clone(),
            }),
            None => Ok(self),
        }
    }
}

const HALTED_MESSAGE: &str = "Not started: run aborted";

enum WorkerOutcome {
    Extracted(Result<ExtractionSchema, ExtractorError>),
    Halted,
}

/// Runs many extractions under a concurrency ceiling
///
/// # Examples
///
/// ```no_run
/// use compass_extractor::{ExtractorConfig, SchemaExtractor};
/// use compass_llm::MockProvider;
/// use compass_orchestrator::{BatchOrchestrator, OrchestratorConfig};
///
/// # async fn example(docs: Vec<compass_domain::CleanedDocument>) -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = SchemaExtractor::new(MockProvider::default(), ExtractorConfig::default())?;
/// let orchestrator = BatchOrchestrator::new(extractor, OrchestratorConfig::default())?;
///
/// let summary = orchestrator.run(docs, None).await;
/// println!("{}", summary.progress.summary());
/// # Ok(())
/// # }
/// ```
pub struct BatchOrchestrator<P: LlmProvider + 'static> {
    extractor: Arc<SchemaExtractor<P>>,
    config: OrchestratorConfig,
    progress: Arc<BatchProgress>,
}

impl<P: LlmProvider + 'static> BatchOrchestrator<P> {
    /// Create an orchestrator, validating `config`
    pub fn new(extractor: SchemaExtractor<P>, config: OrchestratorConfig) -> Result<Self, OrchestratorError> {
        config.validate().map_err(OrchestratorError::Config)?;
        Ok(Self {
            extractor: Arc::new(extractor),
            config,
            progress: Arc::new(BatchProgress::new()),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Live counters, updated as documents finish
    pub fn progress(&self) -> Arc<BatchProgress> {
        Arc::clone(&self.progress)
    }

    /// Extract every document and, when persistence is on, import the results
    ///
    /// Import counters are reset at the start of the batch. A failure
    /// classified as [`FailureKind::Configuration`] stops new calls from
    /// starting; calls already in flight finish and are settled normally.
    pub async fn run(
        &self,
        docs: Vec<CleanedDocument>,
        importer: Option<&mut BatchImporter>,
    ) -> BatchSummary {
        let mut importer = importer.filter(|_| self.config.persist);
        if let Some(importer) = importer.as_deref_mut() {
            importer.begin();
        }

        self.progress.start(docs.len());
        info!(
            documents = docs.len(),
            concurrency = self.config.effective_concurrency(),
            sequential = self.config.sequential,
            persist = importer.is_some(),
            "Starting batch"
        );

        let mut batch = Batch::default();
        if self.config.sequential {
            self.run_sequential(docs, &mut importer, &mut batch).await;
        } else {
            self.run_concurrent(docs, &mut importer, &mut batch).await;
        }

        self.progress.finish();
        let progress = self.progress.snapshot();
        info!(
            processed = progress.processed,
            failed = progress.failed,
            success_rate = progress.success_rate,
            elapsed_ms = progress.elapsed_ms,
            "Batch complete"
        );

        BatchSummary {
            progress,
            persisted: batch.persisted,
            failures: batch.failures,
            import: importer.map(|i| i.stats()),
            aborted: batch.aborted,
            results: batch.results,
        }
    }

    async fn run_sequential(
        &self,
        docs: Vec<CleanedDocument>,
        importer: &mut Option<&mut BatchImporter>,
        batch: &mut Batch,
    ) {
        for doc in docs {
            let outcome = if batch.aborted.is_some() {
                WorkerOutcome::Halted
            } else {
                WorkerOutcome::Extracted(self.extractor.try_extract(&doc).await)
            };
            self.settle(doc.source_ref, outcome, importer.as_deref_mut(), batch);
        }
    }

    async fn run_concurrent(
        &self,
        docs: Vec<CleanedDocument>,
        importer: &mut Option<&mut BatchImporter>,
        batch: &mut Batch,
    ) {
        let gate = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let halt = Arc::new(AtomicBool::new(false));
        let pacing = self.config.pacing_delay();

        let mut tasks = JoinSet::new();
        let mut sources = HashMap::new();

        for doc in docs {
            let source_ref = doc.source_ref.clone();
            let extractor = Arc::clone(&self.extractor);
            let gate = Arc::clone(&gate);
            let halt = Arc::clone(&halt);

            let handle = tasks.spawn(async move {
                let Ok(_permit) = gate.acquire_owned().await else {
                    return WorkerOutcome::Halted;
                };
                if halt.load(Ordering::SeqCst) {
                    return WorkerOutcome::Halted;
                }
                if !pacing.is_zero() {
                    tokio::time::sleep(pacing).await;
                    if halt.load(Ordering::SeqCst) {
                        return WorkerOutcome::Halted;
                    }
                }
                let extracted = extractor.try_extract(&doc).await;
                // Set while the permit is still held
                if let Err(e) = &extracted {
                    if e.failure_kind().aborts_run() {
                        halt.store(true, Ordering::SeqCst);
                    }
                }
                WorkerOutcome::Extracted(extracted)
            });
            sources.insert(handle.id(), source_ref);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    let Some(source_ref) = sources.remove(&id) else {
                        continue;
                    };
                    self.settle(source_ref, outcome, importer.as_deref_mut(), batch);
                    if batch.aborted.is_some() {
                        halt.store(true, Ordering::SeqCst);
                    }
                }
                Err(e) => {
                    let file = sources
                        .remove(&e.id())
                        .map(|s| s.key())
                        .unwrap_or_default();
                    error!(file = %file, stage = "extract", error = %e, "Extraction worker failed");
                    self.progress.record_failure();
                    batch.failures.push(DocumentFailure::new(
                        file,
                        Stage::Extract,
                        FailureKind::TerminalExtraction,
                        e.to_string(),
                    ));
                }
            }
        }
    }

    /// Decide the terminal fate of one document
    fn settle(
        &self,
        source_ref: SourceRef,
        outcome: WorkerOutcome,
        importer: Option<&mut BatchImporter>,
        batch: &mut Batch,
    ) {
        let file = source_ref.key();

        let extracted = match outcome {
            WorkerOutcome::Halted => {
                let failure = DocumentFailure::new(
                    &file,
                    Stage::Extract,
                    FailureKind::Configuration,
                    HALTED_MESSAGE,
                );
                if let Some(importer) = importer {
                    importer.record_skipped(&file, HALTED_MESSAGE);
                }
                self.fail(failure, None, batch);
                return;
            }
            WorkerOutcome::Extracted(extracted) => extracted,
        };

        match extracted {
            Ok(payload) => {
                let result = ExtractionResult::success(source_ref.clone(), payload);
                match importer {
                    Some(importer) => match importer.import(&result) {
                        Ok(outcome) => {
                            debug!(file = %file, outcome = ?outcome, "Persisted");
                            self.succeed(source_ref, batch);
                        }
                        Err(e) => {
                            // The importer already rolled back and marked the file failed
                            let failure =
                                DocumentFailure::new(&file, Stage::Persist, e.failure_kind(), e.to_string());
                            self.fail(failure, None, batch);
                        }
                    },
                    None => self.succeed(source_ref, batch),
                }
                batch.results.push(result);
            }
            Err(e) => {
                let kind = e.failure_kind();
                let message = e.to_string();
                warn!(file = %file, stage = "extract", kind = %kind, error = %message, "Extraction failed");

                let result = ExtractionResult::failure(source_ref, message.clone());
                if let Some(importer) = importer {
                    importer.record_skipped(&file, &message);
                }
                batch.results.push(result);

                let failure = DocumentFailure::new(&file, Stage::Extract, kind, message);
                self.fail(failure, Some(kind), batch);
            }
        }
    }

    fn succeed(&self, source_ref: SourceRef, batch: &mut Batch) {
        self.progress.record_success();
        batch.persisted.push(source_ref);
        let snapshot = self.progress.snapshot();
        debug!(processed = snapshot.processed, total = snapshot.total, "Progress");
    }

    fn fail(&self, failure: DocumentFailure, kind: Option<FailureKind>, batch: &mut Batch) {
        self.progress.record_failure();
        if kind.is_some_and(|k| k.aborts_run()) && batch.aborted.is_none() {
            error!(file = %failure.file, error = %failure.message, "Fatal failure, no new documents will start");
            batch.aborted = Some(failure.clone());
        }
        batch.failures.push(failure);
    }
}

#[derive(Default)]
struct Batch {
    persisted: Vec<SourceRef>,
    failures: Vec<DocumentFailure>,
    results: Vec<ExtractionResult>,
    aborted: Option<DocumentFailure>,
}
