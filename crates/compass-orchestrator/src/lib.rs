//! Compass Orchestrator
//!
//! Batch orchestration and run-mode selection for the extraction pipeline.
//!
//! # Overview
//!
//! The orchestrator is responsible for:
//! - **Bounded fan-out**: at most `concurrency` extraction calls in flight,
//!   each preceded by a fixed pacing delay
//! - **Failure isolation**: a terminal failure on one document never cancels
//!   or delays another; only configuration failures stop new work
//! - **Progress**: processed/failed counters and elapsed time, readable while
//!   the batch runs
//! - **Stage artifacts**: raw, cleaned and processed JSON per input file
//! - **Run modes**: full, clean-only and import-only
//!
//! # Usage
//!
//! ```no_run
//! use compass_extractor::{ExtractorConfig, SchemaExtractor};
//! use compass_ingest::{CleanerConfig, DocumentLoader, PlainTextSource, TextCleaner};
//! use compass_llm::OllamaProvider;
//! use compass_orchestrator::{ArtifactStore, BatchOrchestrator, OrchestratorConfig, Pipeline};
//! use compass_store::{BatchImporter, ImportOptions, SqliteStore};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = SchemaExtractor::new(OllamaProvider::default_endpoint()?, ExtractorConfig::default())?;
//!     let orchestrator = BatchOrchestrator::new(extractor, OrchestratorConfig::default())?;
//!     let mut importer = BatchImporter::new(SqliteStore::new("compass.db")?, ImportOptions::default());
//!
//!     let pipeline = Pipeline::new(
//!         DocumentLoader::new(PlainTextSource::new()),
//!         TextCleaner::new(CleanerConfig::default()),
//!         Some(ArtifactStore::new("out")),
//!     );
//!     let report = pipeline.run(Path::new("plans"), &orchestrator, Some(&mut importer)).await?;
//!     println!("{}", report.summary.summary());
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [orchestrator]
//! concurrency = 4
//! pacing_delay_ms = 250
//! persist = true
//! sequential = false
//! replace = false
//! ```

#![warn(missing_docs)]

mod artifacts;
mod config;
mod error;
mod metrics;
mod orchestrator;
mod pipeline;

pub use artifacts::{ArtifactCollision, ArtifactStage, ArtifactStore, ProcessedArtifacts};
pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use metrics::{BatchProgress, ProgressSnapshot};
pub use orchestrator::{BatchOrchestrator, BatchSummary};
pub use pipeline::{import_only, Pipeline, Prepared, RunMode, RunReport};
