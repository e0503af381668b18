//! Compass Storage Layer
//!
//! Persists successful extractions into a normalized SQLite schema and keeps
//! the per-file processing status ledger.
//!
//! # Architecture
//!
//! - `plans` ← `components` ← `tags`, and `plans` ← `provisions`, all with
//!   `ON DELETE CASCADE`
//! - `processing_status` keyed uniquely by file path and written with an
//!   upsert, so reruns update rather than duplicate
//! - One transaction per document: either every row for a document is written
//!   or none is
//!
//! # Examples
//!
//! ```no_run
//! use compass_store::SqliteStore;
//!
//! let store = SqliteStore::new("compass.db").unwrap();
//! let counts = store.counts().unwrap();
//! println!("{} plans", counts.plans);
//! ```

#![warn(missing_docs)]

mod import;

pub use import::{BatchImporter, ImportOptions, ImportStats};

use compass_domain::{
    Classify, CompensationComponent, Component, EffectiveDates, ExtractionResult,
    ExtractionSchema, FailureKind, Plan, ProcessingStatus, ProcessingStatusRecord, Provision, Tag,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored JSON column could not be encoded or decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Result carries an error instead of a payload
    #[error("Nothing to persist for {0}: extraction failed")]
    NoPayload(String),
}

impl Classify for StoreError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            StoreError::NoPayload(_) => FailureKind::TerminalExtraction,
            StoreError::Database(_) | StoreError::InvalidData(_) => FailureKind::Persistence,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

/// What a persist call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Rows were written
    Written {
        /// Id of the new plan row
        plan_id: i64,
        /// Component rows written
        components: usize,
        /// Provision rows written
        provisions: usize,
        /// Tag rows written
        tags: usize,
    },

    /// The file is already `completed`; nothing was written
    AlreadyCompleted,
}

/// Row counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    /// `plans` rows
    pub plans: usize,
    /// `components` rows
    pub components: usize,
    /// `provisions` rows
    pub provisions: usize,
    /// `tags` rows
    pub tags: usize,
    /// `processing_status` rows
    pub statuses: usize,
}

/// SQLite-backed persistence manager
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share one store between tasks
/// behind a `Mutex`, or give each thread its own instance.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open a fresh in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    /// Persist one extraction result
    ///
    /// Results carrying an `error` are rejected with [`StoreError::NoPayload`]
    /// without touching the database.
    pub fn persist_result(
        &mut self,
        result: &ExtractionResult,
        replace: bool,
    ) -> Result<PersistOutcome, StoreError> {
        let source_file = result.source_ref().key();
        let payload = result
            .payload()
            .ok_or_else(|| StoreError::NoPayload(source_file.clone()))?;
        self.persist(&source_file, payload, replace)
    }

    /// Write one plan and its children in a single transaction, then mark the
    /// file `completed`
    ///
    /// A file already marked `completed` is left untouched unless `replace` is
    /// set, in which case its previous plan rows are deleted first.
    pub fn persist(
        &mut self,
        source_file: &str,
        payload: &ExtractionSchema,
        replace: bool,
    ) -> Result<PersistOutcome, StoreError> {
        let tx = self.conn.transaction()?;

        if !replace && status_in(&tx, source_file)? == Some(ProcessingStatus::Completed) {
            debug!(file = %source_file, "Already completed, skipping");
            return Ok(PersistOutcome::AlreadyCompleted);
        }
        if replace {
            let removed = tx.execute("DELETE FROM plans WHERE source_file = ?1", params![source_file])?;
            if removed > 0 {
                debug!(file = %source_file, removed, "Replaced previous plan rows");
            }
        }

        let outcome = write_plan(&tx, source_file, payload)?;
        upsert_status(&tx, source_file, ProcessingStatus::Completed, None)?;
        tx.commit()?;

        if let PersistOutcome::Written { plan_id, components, provisions, tags } = outcome {
            info!(file = %source_file, plan_id, components, provisions, tags, "Persisted plan");
        }
        Ok(outcome)
    }

    /// Record a terminal failure for `file_path`
    ///
    /// A file that is already `completed` keeps that status; its rows exist.
    pub fn mark_failed(&mut self, file_path: &str, message: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO processing_status (file_path, status, error_message)
             VALUES (?1, 'failed', ?2)
             ON CONFLICT(file_path) DO UPDATE SET
                status = excluded.status,
                error_message = excluded.error_message
             WHERE processing_status.status != 'completed'",
            params![file_path, message],
        )?;
        Ok(())
    }

    /// Record that `file_path` entered the pipeline
    pub fn mark_pending(&mut self, file_path: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO processing_status (file_path, status) VALUES (?1, 'pending')
             ON CONFLICT(file_path) DO NOTHING",
            params![file_path],
        )?;
        Ok(())
    }

    /// Status ledger entry for `file_path`
    pub fn status(&self, file_path: &str) -> Result<Option<ProcessingStatusRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                "SELECT file_path, status, error_message, created_at, updated_at
                 FROM processing_status WHERE file_path = ?1",
                params![file_path],
                row_to_status,
            )
            .optional()?;
        Ok(record)
    }

    /// Every status ledger entry, ordered by path
    pub fn statuses(&self) -> Result<Vec<ProcessingStatusRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT file_path, status, error_message, created_at, updated_at
             FROM processing_status ORDER BY file_path",
        )?;
        let rows = stmt.query_map([], row_to_status)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Row counts per table
    pub fn counts(&self) -> Result<TableCounts, StoreError> {
        let count = |table: &str| -> Result<usize, StoreError> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(TableCounts {
            plans: count("plans")?,
            components: count("components")?,
            provisions: count("provisions")?,
            tags: count("tags")?,
            statuses: count("processing_status")?,
        })
    }

    /// Every plan, oldest first
    pub fn plans(&self) -> Result<Vec<Plan>, StoreError> {
        let mut stmt = self.conn.prepare(&format!("{} ORDER BY id", PLAN_SELECT))?;
        let rows = stmt.query_map([], row_to_plan)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Most recent plan extracted from `source_file`
    pub fn plan_for_source(&self, source_file: &str) -> Result<Option<Plan>, StoreError> {
        let plan = self
            .conn
            .query_row(
                &format!("{} WHERE source_file = ?1 ORDER BY id DESC LIMIT 1", PLAN_SELECT),
                params![source_file],
                row_to_plan,
            )
            .optional()?;
        Ok(plan)
    }

    /// Components of a plan
    pub fn components(&self, plan_id: i64) -> Result<Vec<Component>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, plan_id, name, type, weight, target_amount, frequency, metrics, structure
             FROM components WHERE plan_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![plan_id], |row| {
            Ok((
                Component {
                    id: row.get(0)?,
                    plan_id: row.get(1)?,
                    name: row.get(2)?,
                    kind: row.get(3)?,
                    weight: row.get(4)?,
                    target_amount: row.get(5)?,
                    frequency: row.get(6)?,
                    metrics: Vec::new(),
                    structure: serde_json::Value::Null,
                },
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut components = Vec::new();
        for row in rows {
            let (mut component, metrics, structure) = row?;
            component.metrics = serde_json::from_str(&metrics)?;
            component.structure = serde_json::from_str(&structure)?;
            components.push(component);
        }
        Ok(components)
    }

    /// Special provisions of a plan
    pub fn provisions(&self, plan_id: i64) -> Result<Vec<Provision>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, plan_id, text FROM provisions WHERE plan_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![plan_id], |row| {
            Ok(Provision {
                id: row.get(0)?,
                plan_id: row.get(1)?,
                text: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Tags of a component
    pub fn tags(&self, component_id: i64) -> Result<Vec<Tag>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, component_id, tag FROM tags WHERE component_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![component_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                component_id: row.get(1)?,
                tag: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete every plan extracted from `source_file`; children cascade
    pub fn delete_plans_for(&mut self, source_file: &str) -> Result<usize, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM plans WHERE source_file = ?1", params![source_file])?;
        Ok(removed)
    }
}

const PLAN_SELECT: &str = "SELECT id, title, start_date, end_date, total_target, source_file, \
     summary, payout_schedule, created_at, updated_at FROM plans";

fn write_plan(
    tx: &Transaction<'_>,
    source_file: &str,
    payload: &ExtractionSchema,
) -> Result<PersistOutcome, StoreError> {
    tx.execute(
        "INSERT INTO plans (title, start_date, end_date, total_target, source_file, summary, payout_schedule)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &payload.plan_title,
            &payload.effective_dates.start_date,
            &payload.effective_dates.end_date,
            payload.total_target(),
            source_file,
            &payload.plan_summary,
            &payload.payout_schedule,
        ],
    )?;
    let plan_id = tx.last_insert_rowid();

    let mut provisions = 0;
    if !payload.special_provisions.is_empty() {
        let mut stmt = tx.prepare_cached("INSERT INTO provisions (plan_id, text) VALUES (?1, ?2)")?;
        for text in &payload.special_provisions {
            stmt.execute(params![plan_id, text])?;
            provisions += 1;
        }
    }

    let mut tags = 0;
    let mut insert_component = tx.prepare_cached(
        "INSERT INTO components (plan_id, name, type, weight, target_amount, frequency, metrics, structure)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let mut insert_tag = tx.prepare_cached("INSERT INTO tags (component_id, tag) VALUES (?1, ?2)")?;

    for component in &payload.compensation_components {
        match component {
            // Legacy bare names carry no tags; only the name is kept
            CompensationComponent::Legacy(name) => {
                insert_component.execute(params![plan_id, name, "", None::<f64>, "", "", "[]", "null"])?;
            }
            CompensationComponent::Structured(spec) => {
                let metrics = serde_json::to_string(&spec.metrics.to_list())?;
                let structure = serde_json::to_string(&spec.structure)?;
                insert_component.execute(params![
                    plan_id,
                    &spec.name,
                    &spec.kind,
                    spec.weight,
                    &spec.target_amount,
                    &spec.frequency,
                    metrics,
                    structure,
                ])?;
                let component_id = tx.last_insert_rowid();

                for tag in spec.tags.iter().flatten() {
                    insert_tag.execute(params![component_id, tag])?;
                    tags += 1;
                }
            }
        }
    }

    Ok(PersistOutcome::Written {
        plan_id,
        components: payload.compensation_components.len(),
        provisions,
        tags,
    })
}

fn status_in(tx: &Transaction<'_>, file_path: &str) -> Result<Option<ProcessingStatus>, StoreError> {
    let status: Option<String> = tx
        .query_row(
            "SELECT status FROM processing_status WHERE file_path = ?1",
            params![file_path],
            |row| row.get(0),
        )
        .optional()?;
    status
        .map(|s| s.parse().map_err(StoreError::InvalidData))
        .transpose()
}

fn upsert_status(
    tx: &Transaction<'_>,
    file_path: &str,
    status: ProcessingStatus,
    error_message: Option<&str>,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO processing_status (file_path, status, error_message)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(file_path) DO UPDATE SET
            status = excluded.status,
            error_message = excluded.error_message",
        params![file_path, status.as_str(), error_message],
    )?;
    Ok(())
}

fn row_to_plan(row: &Row<'_>) -> rusqlite::Result<Plan> {
    Ok(Plan {
        id: row.get(0)?,
        title: row.get(1)?,
        effective_dates: EffectiveDates {
            start_date: row.get(2)?,
            end_date: row.get(3)?,
        },
        total_target: row.get(4)?,
        source_file: row.get(5)?,
        summary: row.get(6)?,
        payout_schedule: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn row_to_status(row: &Row<'_>) -> rusqlite::Result<ProcessingStatusRecord> {
    let status: String = row.get(1)?;
    let status = status.parse::<ProcessingStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(ProcessingStatusRecord {
        file_path: row.get(0)?,
        status,
        error_message: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_initialization() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.counts().unwrap(), TableCounts::default());
    }

    #[test]
    fn test_schema_is_reentrant() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compass.db");
        drop(SqliteStore::new(&path).unwrap());
        assert!(SqliteStore::new(&path).is_ok());
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store.conn.execute(
            "INSERT INTO components (plan_id, name) VALUES (999, 'Orphan')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_mark_pending_then_failed() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.mark_pending("a.txt").unwrap();
        assert_eq!(store.status("a.txt").unwrap().unwrap().status, ProcessingStatus::Pending);

        store.mark_failed("a.txt", "boom").unwrap();
        let record = store.status("a.txt").unwrap().unwrap();
        assert_eq!(record.status, ProcessingStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("boom"));
        assert_eq!(store.counts().unwrap().statuses, 1);
    }

    #[test]
    fn test_status_check_constraint() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store.conn.execute(
            "INSERT INTO processing_status (file_path, status) VALUES ('x', 'done')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            StoreError::InvalidData("x".into()).failure_kind(),
            FailureKind::Persistence
        );
    }
}
