//! Batch import of extraction results
//!
//! Counters are reset at the start of every [`BatchImporter::import_all`] (or
//! explicit [`BatchImporter::begin`]) and accumulate per result after that.

use crate::{PersistOutcome, SqliteStore, StoreError};
use compass_domain::ExtractionResult;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Import behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Delete a file's previous plan before writing a new one
    pub replace: bool,
}

/// Running counters for one batch import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    /// Plans written
    pub plans_imported: usize,
    /// Components written
    pub components_imported: usize,
    /// Provisions written
    pub provisions_imported: usize,
    /// Tags written
    pub tags_imported: usize,
    /// Results written or already completed
    pub succeeded: usize,
    /// Error results and failed writes
    pub failed: usize,
    /// Results skipped because the file was already completed
    pub already_completed: usize,
}

/// Imports extraction results into a [`SqliteStore`] and keeps counters
pub struct BatchImporter {
    store: SqliteStore,
    options: ImportOptions,
    stats: ImportStats,
}

impl BatchImporter {
    /// Create an importer that owns `store`
    pub fn new(store: SqliteStore, options: ImportOptions) -> Self {
        Self {
            store,
            options,
            stats: ImportStats::default(),
        }
    }

    /// Reset the counters for a new batch
    pub fn begin(&mut self) {
        self.stats = ImportStats::default();
    }

    /// Counters since the last reset
    pub fn stats(&self) -> ImportStats {
        self.stats
    }

    /// Underlying store
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Underlying store, mutably
    pub fn store_mut(&mut self) -> &mut SqliteStore {
        &mut self.store
    }

    /// Give back the store
    pub fn into_store(self) -> SqliteStore {
        self.store
    }

    /// Import one result and update the counters
    ///
    /// Error results are counted as failed and never reach the database. A
    /// failed write is rolled back, counted, and its file marked `failed`.
    pub fn import(&mut self, result: &ExtractionResult) -> Result<PersistOutcome, StoreError> {
        let file = result.source_ref().key();

        if let Some(error) = result.error() {
            warn!(file = %file, stage = "persist", error = %error, "Skipping failed extraction");
            self.stats.failed += 1;
            return Err(StoreError::NoPayload(file));
        }

        match self.store.persist_result(result, self.options.replace) {
            Ok(outcome) => {
                self.record(outcome);
                Ok(outcome)
            }
            Err(e) => {
                warn!(file = %file, stage = "persist", error = %e, "Write rolled back");
                self.stats.failed += 1;
                if let Err(mark_err) = self.store.mark_failed(&file, &e.to_string()) {
                    warn!(file = %file, error = %mark_err, "Could not record failed status");
                }
                Err(e)
            }
        }
    }

    /// Count a document that never produced a payload and mark it `failed`
    ///
    /// Nothing is written besides the status row, and a file that is already
    /// `completed` keeps that status.
    pub fn record_skipped(&mut self, file: &str, reason: &str) {
        warn!(file = %file, stage = "persist", error = %reason, "Recording failed document");
        self.stats.failed += 1;
        if let Err(e) = self.store.mark_failed(file, reason) {
            warn!(file = %file, error = %e, "Could not record failed status");
        }
    }

    /// Reset the counters and import every result
    pub fn import_all(&mut self, results: &[ExtractionResult]) -> ImportStats {
        self.begin();
        for result in results {
            // Failures are already counted and logged
            let _ = self.import(result);
        }

        info!(
            plans = self.stats.plans_imported,
            components = self.stats.components_imported,
            tags = self.stats.tags_imported,
            succeeded = self.stats.succeeded,
            failed = self.stats.failed,
            "Batch import complete"
        );
        self.stats
    }

    fn record(&mut self, outcome: PersistOutcome) {
        self.stats.succeeded += 1;
        match outcome {
            PersistOutcome::Written {
                components,
                provisions,
                tags,
                ..
            } => {
                self.stats.plans_imported += 1;
                self.stats.components_imported += components;
                self.stats.provisions_imported += provisions;
                self.stats.tags_imported += tags;
            }
            PersistOutcome::AlreadyCompleted => self.stats.already_completed += 1,
        }
    }
}
