//! The fixed extraction contract
//!
//! [`ExtractionSchema`] is the JSON object the generative service must fill.
//! Field names on the wire are camelCase; the JSON Schema handed to the
//! service comes from [`ExtractionSchema::json_schema`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

/// Structured content of one compensation plan document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSchema {
    /// Title of the plan
    pub plan_title: String,

    /// Period the plan is in force
    pub effective_dates: EffectiveDates,

    /// Short prose summary
    #[serde(default)]
    pub plan_summary: String,

    /// Compensation elements of the plan
    pub compensation_components: Vec<CompensationComponent>,

    /// How and when payouts happen
    #[serde(default)]
    pub payout_schedule: String,

    /// Free-text special provisions (windfall, true-up, disaster adjustments)
    #[serde(default)]
    pub special_provisions: Vec<String>,
}

/// Start and end dates as written in the plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveDates {
    /// Start date text
    #[serde(default, deserialize_with = "nullable_string")]
    pub start_date: String,

    /// End date text
    #[serde(default, deserialize_with = "nullable_string")]
    pub end_date: String,
}

/// A compensation component in either of its accepted shapes
///
/// Older extraction output listed components as bare names. Those are still
/// accepted and persisted with every field but the name left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompensationComponent {
    /// Full structured form
    Structured(ComponentSpec),

    /// Bare-string legacy form (name only)
    Legacy(String),
}

impl CompensationComponent {
    /// Name of the component regardless of shape
    pub fn name(&self) -> &str {
        match self {
            CompensationComponent::Structured(spec) => &spec.name,
            CompensationComponent::Legacy(name) => name,
        }
    }
}

/// Structured description of one compensation component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Component name, e.g. "Quarterly Bonus"
    pub name: String,

    /// Component type, e.g. "Bonus", "Commission", "Draw"
    #[serde(rename = "type", default, deserialize_with = "nullable_string")]
    pub kind: String,

    /// Target amount as written, e.g. "$10,000"
    #[serde(default, deserialize_with = "string_or_number")]
    pub target_amount: String,

    /// Payout frequency, e.g. "Quarterly"
    #[serde(default, deserialize_with = "nullable_string")]
    pub frequency: String,

    /// Payout structure; prose or a nested object
    #[serde(default)]
    pub structure: Value,

    /// Performance metrics the component is measured on
    #[serde(default)]
    pub metrics: Metrics,

    /// Relative weight of the component in the plan, when stated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    /// Free-form labels attached to the component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ComponentSpec {
    /// A spec holding only a name, as persisted for legacy components
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: String::new(),
            target_amount: String::new(),
            frequency: String::new(),
            structure: Value::Null,
            metrics: Metrics::default(),
            weight: None,
            tags: None,
        }
    }
}

/// Metrics field as returned by the service: a list, or occasionally one string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metrics {
    /// Expected form
    List(Vec<String>),

    /// A single metric given as a plain string
    Single(String),
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics::List(Vec::new())
    }
}

impl Metrics {
    /// Normalize into a list; a blank single string becomes an empty list
    ///
    /// # Examples
    ///
    /// ```
    /// use compass_domain::Metrics;
    ///
    /// assert_eq!(Metrics::Single("Revenue".into()).to_list(), vec!["Revenue"]);
    /// assert!(Metrics::Single("  ".into()).to_list().is_empty());
    /// ```
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Metrics::List(items) => items.clone(),
            Metrics::Single(item) if item.trim().is_empty() => Vec::new(),
            Metrics::Single(item) => vec![item.trim().to_string()],
        }
    }
}

impl ExtractionSchema {
    /// JSON Schema describing the contract, sent with every extraction request
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "planTitle": { "type": "string" },
                "effectiveDates": {
                    "type": "object",
                    "properties": {
                        "startDate": { "type": "string" },
                        "endDate": { "type": "string" }
                    },
                    "required": ["startDate", "endDate"]
                },
                "planSummary": { "type": "string" },
                "compensationComponents": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "type": { "type": "string" },
                            "targetAmount": { "type": "string" },
                            "frequency": { "type": "string" },
                            "structure": { "type": "string" },
                            "metrics": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["name", "type", "targetAmount", "frequency", "structure", "metrics"]
                    }
                },
                "payoutSchedule": { "type": "string" },
                "specialProvisions": { "type": "array", "items": { "type": "string" } }
            },
            "required": [
                "planTitle",
                "effectiveDates",
                "planSummary",
                "compensationComponents",
                "payoutSchedule",
                "specialProvisions"
            ]
        })
    }

    /// Sum of every component target amount that reads as money
    ///
    /// Returns `None` when no component carries a parseable amount.
    pub fn total_target(&self) -> Option<f64> {
        let amounts: Vec<f64> = self
            .compensation_components
            .iter()
            .filter_map(|c| match c {
                CompensationComponent::Structured(spec) => parse_money(&spec.target_amount),
                CompensationComponent::Legacy(_) => None,
            })
            .collect();

        if amounts.is_empty() {
            None
        } else {
            Some(amounts.iter().sum())
        }
    }
}

/// Parse a monetary string such as "$10,000", "$75K", "1.5M" or "USD 2,500.50"
///
/// # Examples
///
/// ```
/// use compass_domain::schema::parse_money;
///
/// assert_eq!(parse_money("$10,000"), Some(10_000.0));
/// assert_eq!(parse_money("$75K"), Some(75_000.0));
/// assert_eq!(parse_money("1.5M"), Some(1_500_000.0));
/// assert_eq!(parse_money("100% of target"), None);
/// assert_eq!(parse_money("varies"), None);
/// ```
pub fn parse_money(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.contains('%') {
        return None;
    }

    let start = trimmed.find(|c: char| c.is_ascii_digit())?;
    let rest = &trimmed[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .unwrap_or(rest.len());
    let number: f64 = rest[..end].replace(',', "").trim_end_matches('.').parse().ok()?;

    let multiplier = match rest[end..].trim_start().chars().next() {
        Some('k') | Some('K') => 1_000.0,
        Some('m') | Some('M') => 1_000_000.0,
        _ => 1.0,
    };

    Some(number * multiplier)
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for targetAmount, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "planTitle": "FY25 Plan",
        "effectiveDates": {"startDate": "Jan 1, 2025", "endDate": "Dec 31, 2025"},
        "planSummary": "Quarterly bonus plan",
        "compensationComponents": [
            {"name": "Bonus", "type": "Bonus", "targetAmount": "$10,000",
             "frequency": "Quarterly", "structure": "Paid on attainment", "metrics": ["Revenue"]},
            "Legacy Draw"
        ],
        "payoutSchedule": "Quarterly in arrears",
        "specialProvisions": ["Windfall clause"]
    }"#;

    #[test]
    fn test_parse_mixed_component_shapes() {
        let schema: ExtractionSchema = serde_json::from_str(FULL).unwrap();
        assert_eq!(schema.compensation_components.len(), 2);
        assert!(matches!(
            schema.compensation_components[0],
            CompensationComponent::Structured(_)
        ));
        assert_eq!(
            schema.compensation_components[1],
            CompensationComponent::Legacy("Legacy Draw".to_string())
        );
        assert_eq!(schema.compensation_components[1].name(), "Legacy Draw");
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{
            "planTitle": "FY25 Plan",
            "effectiveDates": {"startDate": "Jan 1, 2025", "endDate": "Dec 31, 2025"},
            "compensationComponents": [],
            "specialProvisions": []
        }"#;
        let schema: ExtractionSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.plan_summary, "");
        assert_eq!(schema.payout_schedule, "");
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let json = r#"{"planTitle": "FY25 Plan", "compensationComponents": []}"#;
        assert!(serde_json::from_str::<ExtractionSchema>(json).is_err());
    }

    #[test]
    fn test_single_string_metrics() {
        let json = r#"{"name": "Commission", "metrics": "Bookings"}"#;
        let spec: ComponentSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.metrics.to_list(), vec!["Bookings".to_string()]);
    }

    #[test]
    fn test_numeric_target_amount() {
        let json = r#"{"name": "Bonus", "targetAmount": 5000}"#;
        let spec: ComponentSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.target_amount, "5000");
    }

    #[test]
    fn test_total_target_skips_unparseable() {
        let mut schema: ExtractionSchema = serde_json::from_str(FULL).unwrap();
        assert_eq!(schema.total_target(), Some(10_000.0));

        schema.compensation_components = vec![CompensationComponent::Legacy("Draw".into())];
        assert_eq!(schema.total_target(), None);
    }

    #[test]
    fn test_json_schema_lists_required_keys() {
        let schema = ExtractionSchema::json_schema();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "compensationComponents"));
        assert_eq!(schema["properties"]["specialProvisions"]["type"], "array");
    }
}
