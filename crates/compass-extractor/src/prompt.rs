//! Prompt construction for plan extraction

use compass_domain::StructuralHints;

/// System instruction sent with every extraction request
pub const SYSTEM_INSTRUCTIONS: &str = r#"You extract structured data from sales compensation plan documents.
Return a single JSON object that matches the provided schema exactly.

Rules:
- planTitle: the plan's name as written
- effectiveDates: start and end dates as written; empty strings if absent
- compensationComponents: one object per bonus, commission, draw, incentive or similar element
  - targetAmount keeps the document's formatting (e.g. "$10,000")
  - metrics is a list of strings, empty if none are named
  - structure describes how the payout is computed
- specialProvisions: windfall, true-up, disaster or other special clauses, verbatim, one per entry
- Do not invent values that are not in the document"#;

const OUTPUT_REMINDER: &str =
    "Return ONLY the JSON object, no markdown code blocks, no explanations.";

/// Builds the user prompt for one document
pub struct PromptBuilder<'a> {
    text: &'a str,
    hints: Option<&'a StructuralHints>,
    truncated: bool,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            hints: None,
            truncated: false,
        }
    }

    /// Include advisory hints from the cleaner
    pub fn with_hints(mut self, hints: Option<&'a StructuralHints>) -> Self {
        self.hints = hints;
        self
    }

    /// Note that the document was cut to fit the input budget
    pub fn truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        if let Some(hints) = self.hints {
            let section = hint_section(hints);
            if !section.is_empty() {
                prompt.push_str("Advisory hints (may be incomplete or wrong):\n");
                prompt.push_str(&section);
                prompt.push('\n');
            }
        }

        if self.truncated {
            prompt.push_str("Note: the document was truncated to fit the input limit.\n\n");
        }

        prompt.push_str("Document:\n---\n");
        prompt.push_str(self.text);
        prompt.push_str("\n---\n\n");
        prompt.push_str(OUTPUT_REMINDER);

        prompt
    }
}

fn hint_section(hints: &StructuralHints) -> String {
    let mut out = String::new();
    if let Some(title) = &hints.title {
        out.push_str(&format!("- Title: {}\n", title));
    }
    if let Some(period) = &hints.effective_period {
        out.push_str(&format!("- Effective: {} to {}\n", period.start, period.end));
    }
    if !hints.candidate_components.is_empty() {
        out.push_str(&format!(
            "- Possible components: {}\n",
            hints.candidate_components.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_domain::EffectivePeriodHint;

    #[test]
    fn test_prompt_includes_text() {
        let prompt = PromptBuilder::new("Bonus of $10,000").build();
        assert!(prompt.contains("Bonus of $10,000"));
        assert!(prompt.contains("Return ONLY the JSON object"));
        assert!(!prompt.contains("Advisory hints"));
    }

    #[test]
    fn test_prompt_includes_hints() {
        let hints = StructuralHints {
            title: Some("FY25 Plan".to_string()),
            effective_period: Some(EffectivePeriodHint {
                start: "Jan 1, 2025".to_string(),
                end: "Dec 31, 2025".to_string(),
            }),
            candidate_components: vec!["Quarterly Bonus".to_string()],
            ..StructuralHints::default()
        };
        let prompt = PromptBuilder::new("text").with_hints(Some(&hints)).build();
        assert!(prompt.contains("- Title: FY25 Plan"));
        assert!(prompt.contains("Jan 1, 2025 to Dec 31, 2025"));
        assert!(prompt.contains("Quarterly Bonus"));
    }

    #[test]
    fn test_empty_hints_add_nothing() {
        let hints = StructuralHints::default();
        let prompt = PromptBuilder::new("text").with_hints(Some(&hints)).build();
        assert!(!prompt.contains("Advisory hints"));
    }

    #[test]
    fn test_truncation_note() {
        let prompt = PromptBuilder::new("text").truncated(true).build();
        assert!(prompt.contains("truncated"));
    }
}
