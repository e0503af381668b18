//! Core SchemaExtractor implementation

use crate::budget::TokenBudget;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::parse_response;
use crate::prompt::{PromptBuilder, SYSTEM_INSTRUCTIONS};
use compass_domain::traits::{GenerationRequest, LlmProvider};
use compass_domain::{Classify, CleanedDocument, ExtractionResult, ExtractionSchema};
use compass_llm::{retry_with_backoff, RetryClass, RetryError};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Issues one schema-constrained extraction call per document
pub struct SchemaExtractor<P: LlmProvider> {
    provider: Arc<P>,
    config: ExtractorConfig,
    budget: TokenBudget,
    schema: Value,
}

impl<P: LlmProvider> SchemaExtractor<P> {
    /// Create a new extractor, validating `config`
    pub fn new(provider: P, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        Self::with_shared(Arc::new(provider), config)
    }

    /// Create an extractor around a provider shared with other components
    pub fn with_shared(provider: Arc<P>, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        let budget = TokenBudget::new(config.max_input_tokens, config.chars_per_token);

        Ok(Self {
            provider,
            config,
            budget,
            schema: ExtractionSchema::json_schema(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract the schema from one document
    ///
    /// Never returns an error: every failure is folded into an
    /// [`ExtractionResult`] carrying an `error` message.
    pub async fn extract(&self, doc: &CleanedDocument) -> ExtractionResult {
        match self.try_extract(doc).await {
            Ok(payload) => ExtractionResult::success(doc.source_ref.clone(), payload),
            Err(e) => {
                warn!(file = %doc.source_ref.key(), stage = "extract", kind = %e.failure_kind(), error = %e, "Extraction failed");
                ExtractionResult::failure(doc.source_ref.clone(), e.to_string())
            }
        }
    }

    /// Extract the schema, keeping the typed error for classification
    pub async fn try_extract(&self, doc: &CleanedDocument) -> Result<ExtractionSchema, ExtractorError> {
        let file = doc.source_ref.key();
        if doc.cleaned_text.trim().is_empty() {
            return Err(ExtractorError::EmptyText);
        }

        let fitted = self.budget.fit(&doc.cleaned_text);
        if fitted.truncated() {
            warn!(
                file = %file,
                estimated_tokens = fitted.original_tokens,
                max_tokens = self.budget.max_tokens(),
                kept_tokens = fitted.kept_tokens,
                "Input exceeds token budget, truncating"
            );
        }

        let prompt = PromptBuilder::new(&fitted.text)
            .with_hints(doc.structural_hints.as_ref())
            .truncated(fitted.truncated())
            .build();

        let request = GenerationRequest {
            model: self.config.model.clone(),
            system: SYSTEM_INSTRUCTIONS.to_string(),
            prompt,
            schema: self.schema.clone(),
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        };

        debug!(file = %file, provider = self.provider.name(), prompt_chars = request.prompt.len(), "Requesting extraction");

        let raw = self.call_with_retry(&request).await?;
        let payload = parse_response(&raw)?;

        info!(
            file = %file,
            plan = %payload.plan_title,
            components = payload.compensation_components.len(),
            "Extraction complete"
        );
        Ok(payload)
    }

    /// One provider call per attempt, each bounded by the request timeout
    async fn call_with_retry(&self, request: &GenerationRequest) -> Result<String, ExtractorError> {
        let provider = &self.provider;
        let limit = self.config.request_timeout();
        let limit_secs = self.config.request_timeout_secs;

        let outcome = retry_with_backoff(
            &self.config.retry,
            move |attempt| async move {
                debug!(attempt, "Calling provider");
                match timeout(limit, provider.generate_structured(request)).await {
                    Ok(Ok(text)) => Ok(text),
                    Ok(Err(e)) => Err(ExtractorError::Provider {
                        kind: e.failure_kind(),
                        message: e.to_string(),
                    }),
                    Err(_) => Err(ExtractorError::Timeout(limit_secs)),
                }
            },
            |e: &ExtractorError| RetryClass::from(e.failure_kind()),
        )
        .await;

        outcome.map_err(|e| match e {
            RetryError::Exhausted { attempts, last } => ExtractorError::Exhausted {
                attempts,
                last: last.to_string(),
            },
            RetryError::Permanent { error, .. } => error,
        })
    }
}
