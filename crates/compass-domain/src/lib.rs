//! Compass Domain Layer
//!
//! Core data model for the compensation-plan extraction pipeline. Every other
//! crate in the workspace depends on the types and trait boundaries defined here.
//!
//! ## Key Concepts
//!
//! - **RawDocument**: unmodified text from one source file plus minimal metadata
//! - **CleanedDocument**: a raw document after boilerplate removal and
//!   normalization, with advisory structural hints
//! - **ExtractionSchema**: the fixed JSON contract the generative service fills
//! - **ExtractionResult**: either a schema payload or an explicit error, never both
//! - **Persisted entities**: plans, components, provisions, tags and the
//!   per-file processing status ledger
//!
//! ## Architecture
//!
//! - Pure data and classification logic, no I/O
//! - Trait definitions for the two external capabilities the pipeline relies
//!   on: text extraction ([`traits::TextSource`]) and structured generation
//!   ([`traits::LlmProvider`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod entities;
pub mod failure;
pub mod result;
pub mod schema;
pub mod traits;

// Re-exports for convenience
pub use document::{
    CleanedDocument, DocumentId, EffectivePeriodHint, RawDocument, ReductionStats, SectionHint,
    SourceRef, StructuralHints,
};
pub use entities::{Component, Plan, ProcessingStatus, ProcessingStatusRecord, Provision, Tag};
pub use failure::{Classify, DocumentFailure, FailureKind, Stage};
pub use result::ExtractionResult;
pub use schema::{CompensationComponent, ComponentSpec, EffectiveDates, ExtractionSchema, Metrics};
