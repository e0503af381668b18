//! Outcome of one extraction call

use crate::document::SourceRef;
use crate::schema::ExtractionSchema;
use serde::{Deserialize, Serialize};

/// Either a schema-valid payload or an explicit error, never a partial schema
///
/// Serialized as `{"sourceRef": ..., "payload": {...}}` or
/// `{"sourceRef": ..., "error": "..."}`, which is also the format of the
/// processed-stage artifact files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionResult {
    /// The service returned the requested shape
    Success {
        /// Source document
        #[serde(rename = "sourceRef")]
        source_ref: SourceRef,
        /// Extracted content
        payload: ExtractionSchema,
    },

    /// Extraction failed terminally for this document
    Failure {
        /// Source document
        #[serde(rename = "sourceRef")]
        source_ref: SourceRef,
        /// What went wrong
        error: String,
    },
}

impl ExtractionResult {
    /// Build a success result
    pub fn success(source_ref: SourceRef, payload: ExtractionSchema) -> Self {
        ExtractionResult::Success { source_ref, payload }
    }

    /// Build a failure result
    pub fn failure(source_ref: SourceRef, error: impl Into<String>) -> Self {
        ExtractionResult::Failure {
            source_ref,
            error: error.into(),
        }
    }

    /// Source document of either shape
    pub fn source_ref(&self) -> &SourceRef {
        match self {
            ExtractionResult::Success { source_ref, .. } => source_ref,
            ExtractionResult::Failure { source_ref, .. } => source_ref,
        }
    }

    /// Payload, if extraction succeeded
    pub fn payload(&self) -> Option<&ExtractionSchema> {
        match self {
            ExtractionResult::Success { payload, .. } => Some(payload),
            ExtractionResult::Failure { .. } => None,
        }
    }

    /// Error message, if extraction failed
    pub fn error(&self) -> Option<&str> {
        match self {
            ExtractionResult::Success { .. } => None,
            ExtractionResult::Failure { error, .. } => Some(error),
        }
    }

    /// Whether this is a success
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RawDocument;
    use crate::schema::EffectiveDates;

    fn payload() -> ExtractionSchema {
        ExtractionSchema {
            plan_title: "FY25 Plan".to_string(),
            effective_dates: EffectiveDates {
                start_date: "Jan 1, 2025".to_string(),
                end_date: "Dec 31, 2025".to_string(),
            },
            plan_summary: String::new(),
            compensation_components: Vec::new(),
            payout_schedule: String::new(),
            special_provisions: Vec::new(),
        }
    }

    #[test]
    fn test_success_shape_has_no_error_key() {
        let source = RawDocument::new("plan.txt", "text", 1).source_ref();
        let result = ExtractionResult::success(source, payload());
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("payload").is_some());
        assert!(value.get("error").is_none());
        assert!(value.get("sourceRef").is_some());
    }

    #[test]
    fn test_failure_shape_reads_back() {
        let source = RawDocument::new("plan.txt", "text", 1).source_ref();
        let result = ExtractionResult::failure(source.clone(), "retries exhausted");
        let json = serde_json::to_string(&result).unwrap();
        let parsed: ExtractionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.error(), Some("retries exhausted"));
        assert!(parsed.payload().is_none());
        assert_eq!(parsed.source_ref(), &source);
    }
}
