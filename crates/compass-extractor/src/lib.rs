//! Compass Schema Extractor
//!
//! Turns one [`CleanedDocument`](compass_domain::CleanedDocument) into one
//! [`ExtractionResult`](compass_domain::ExtractionResult) with a single
//! schema-constrained call to an [`LlmProvider`](compass_domain::traits::LlmProvider).
//!
//! # Architecture
//!
//! ```text
//! CleanedDocument → TokenBudget → PromptBuilder → retry(timeout(provider)) → parser → ExtractionResult
//! ```
//!
//! # Key Features
//!
//! - **Token-budget guard**: oversized text is truncated deterministically so
//!   one request is still issued
//! - **Deterministic generation**: temperature defaults to 0
//! - **Retry/backoff**: transient failures retried per [`compass_llm::RetryPolicy`]
//! - **Response validation**: anything that is not exactly the schema becomes an
//!   error result, never a partial payload
//!
//! # Example Usage
//!
//! ```no_run
//! use compass_extractor::{ExtractorConfig, SchemaExtractor};
//! use compass_llm::OllamaProvider;
//!
//! # async fn example(doc: compass_domain::CleanedDocument) -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OllamaProvider::default_endpoint()?;
//! let extractor = SchemaExtractor::new(provider, ExtractorConfig::default())?;
//!
//! let result = extractor.extract(&doc).await;
//! match result.payload() {
//!     Some(plan) => println!("{}: {} components", plan.plan_title, plan.compensation_components.len()),
//!     None => println!("failed: {}", result.error().unwrap_or_default()),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod budget;
mod config;
mod error;
mod extractor;
mod parser;
mod prompt;


pub use budget::{Fitted, TokenBudget};
pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::SchemaExtractor;
pub use parser::parse_response;
pub use prompt::{PromptBuilder, SYSTEM_INSTRUCTIONS};
