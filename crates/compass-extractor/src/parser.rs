//! Parse provider output into the extraction schema

use crate::error::ExtractorError;
use compass_domain::ExtractionSchema;
use serde_json::Value;

/// Parse a provider response into an [`ExtractionSchema`]
///
/// A surrounding markdown code fence is tolerated. Anything else that is not
/// exactly the schema shape is an [`ExtractorError::InvalidFormat`].
pub fn parse_response(response: &str) -> Result<ExtractionSchema, ExtractorError> {
    let json_str = strip_code_fence(response)?;

    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| ExtractorError::InvalidFormat(format!("JSON parse error: {}", e)))?;

    if !value.is_object() {
        return Err(ExtractorError::InvalidFormat(
            "Expected a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| ExtractorError::InvalidFormat(format!("Schema mismatch: {}", e)))
}

fn strip_code_fence(response: &str) -> Result<&str, ExtractorError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(ExtractorError::InvalidFormat("Empty response".to_string()));
    }
    if !trimmed.starts_with("```") {
        return Ok(trimmed);
    }

    // Drop the opening fence line (``` or ```json) and the closing fence
    let body = trimmed
        .split_once('\n')
        .map(|(_, rest)| rest)
        .ok_or_else(|| ExtractorError::InvalidFormat("Empty code block".to_string()))?;
    let body = body.trim_end();
    Ok(body.strip_suffix("```").unwrap_or(body).trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_domain::CompensationComponent;

    const VALID: &str = r#"{
        "planTitle": "FY25 Plan",
        "effectiveDates": {"startDate": "Jan 1, 2025", "endDate": "Dec 31, 2025"},
        "planSummary": "Field sales",
        "compensationComponents": [
            {"name": "Bonus", "type": "Bonus", "targetAmount": "$10,000", "frequency": "Quarterly",
             "structure": "Paid on attainment", "metrics": []}
        ],
        "payoutSchedule": "Quarterly",
        "specialProvisions": []
    }"#;

    #[test]
    fn test_parse_valid() {
        let schema = parse_response(VALID).unwrap();
        assert_eq!(schema.plan_title, "FY25 Plan");
        assert_eq!(schema.compensation_components.len(), 1);
    }

    #[test]
    fn test_parse_code_fence() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert!(parse_response(&fenced).is_ok());

        let bare_fence = format!("```\n{}\n```\n", VALID);
        assert!(parse_response(&bare_fence).is_ok());
    }

    #[test]
    fn test_parse_legacy_components() {
        let schema = parse_response(
            r#"{"planTitle": "Old", "effectiveDates": {"startDate": null, "endDate": null},
                "compensationComponents": ["Commission", "Draw"]}"#,
        )
        .unwrap();
        assert!(matches!(
            &schema.compensation_components[0],
            CompensationComponent::Legacy(name) if name == "Commission"
        ));
        assert!(schema.special_provisions.is_empty());
    }

    #[test]
    fn test_rejects_non_json() {
        let result = parse_response("I could not find a plan in this document.");
        assert!(matches!(result, Err(ExtractorError::InvalidFormat(_))));
    }

    #[test]
    fn test_rejects_array() {
        assert!(parse_response("[]").is_err());
    }

    #[test]
    fn test_rejects_missing_required_field() {
        let result = parse_response(r#"{"planTitle": "FY25 Plan"}"#);
        assert!(matches!(result, Err(ExtractorError::InvalidFormat(m)) if m.contains("Schema mismatch")));
    }

    #[test]
    fn test_rejects_wrong_type() {
        let result = parse_response(
            r#"{"planTitle": 7, "effectiveDates": {}, "compensationComponents": []}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(parse_response("  ").is_err());
        assert!(parse_response("```").is_err());
    }
}
