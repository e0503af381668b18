//! Text cleaning
//!
//! Three steps, in order:
//!
//! 1. delete every match of the boilerplate removal patterns
//! 2. apply the normalization rules
//! 3. best-effort structural annotation (see [`crate::annotate`])
//!
//! Horizontal whitespace of any kind is folded to a single space first, and
//! steps 1 and 2 repeat until the text stops changing, so a marker exposed
//! by an earlier deletion is removed in the same call. Cleaning
//! already-cleaned text changes nothing.

use crate::hints::annotate;
use compass_domain::{CleanedDocument, RawDocument, ReductionStats};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Boilerplate deleted outright, applied in order
static REMOVAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // Confidentiality and legal notices
        Regex::new(r"(?i)\b(?:strictly\s+)?(?:confidential|proprietary)(?:\s+(?:and|&)\s+(?:confidential|proprietary))?\b").unwrap(),
        Regex::new(r"(?i)\bfor\s+internal\s+use\s+only\b\.?").unwrap(),
        Regex::new(r"(?i)\ball\s+rights\s+reserved\b\.?").unwrap(),
        Regex::new(r"(?i)(?:©|\(c\)|\bcopyright\b)\s*\d{4}[^\n]*").unwrap(),
        // Page markers
        Regex::new(r"(?i)\bpage\s+\d+\s+of\s+\d+\b").unwrap(),
        Regex::new(r"(?im)^[ \t]*page\s+\d+[ \t]*$").unwrap(),
        Regex::new(r"(?m)^[ \t]*-[ \t]*\d+[ \t]*-[ \t]*$").unwrap(),
        // Table of contents
        Regex::new(r"(?im)^[ \t]*table\s+of\s+contents[ \t]*$").unwrap(),
        Regex::new(r"(?m)^[^\n]*\.{4,}[ \t]*\d+[ \t]*$").unwrap(),
    ]
});

/// Tabs, NBSP and every other Unicode space separator
static HORIZONTAL_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\t\p{Zs}]+").unwrap());

/// Upper bound on removal/normalization rounds per call
const MAX_PASSES: usize = 8;

/// Normalization rules as (pattern, replacement), applied in order
static NORMALIZATION_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (HORIZONTAL_SPACE.clone(), " "),
        (Regex::new(r"(?m)^ | $").unwrap(), ""),
        (Regex::new(r"\n{3,}").unwrap(), "\n\n"),
        (Regex::new(r"\b([IVX]{1,6})\.[ \t]*([A-Z])").unwrap(), "$1. $2"),
    ]
});

/// Cleaner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Derive structural hints at all
    pub annotate: bool,

    /// Skip annotation for texts longer than this (characters)
    pub max_hint_chars: usize,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            annotate: true,
            max_hint_chars: 500_000,
        }
    }
}

impl CleanerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.annotate && self.max_hint_chars == 0 {
            return Err("max_hint_chars must be greater than 0 when annotate is on".to_string());
        }
        Ok(())
    }
}

/// Turns raw documents into cleaned documents
#[derive(Debug, Clone, Default)]
pub struct TextCleaner {
    config: CleanerConfig,
}

impl TextCleaner {
    /// Create a cleaner
    pub fn new(config: CleanerConfig) -> Self {
        Self { config }
    }

    /// Clean one raw document; never fails
    pub fn clean(&self, raw: &RawDocument) -> CleanedDocument {
        let cleaned_text = self.clean_text(&raw.raw_text);
        let reduction_stats =
            ReductionStats::compute(raw.raw_text.chars().count(), cleaned_text.chars().count());

        let structural_hints = if self.config.annotate {
            match annotate(&cleaned_text, self.config.max_hint_chars) {
                Ok(hints) => Some(hints),
                Err(e) => {
                    warn!(file = %raw.source_path.display(), stage = "clean", error = %e, "Skipping structural hints");
                    None
                }
            }
        } else {
            None
        };

        debug!(
            file = %raw.source_path.display(),
            original = reduction_stats.original_length,
            cleaned = reduction_stats.cleaned_length,
            reduction_pct = reduction_stats.reduction_pct,
            "Cleaned"
        );

        CleanedDocument {
            source_ref: raw.source_ref(),
            cleaned_text,
            reduction_stats,
            structural_hints,
        }
    }

    /// Apply removal patterns then normalization rules
    ///
    /// # Examples
    ///
    /// ```
    /// use compass_ingest::TextCleaner;
    ///
    /// let cleaner = TextCleaner::default();
    /// let once = cleaner.clean_text("FY25 Confidential Plan\n\n\n\nI.Overview   text");
    /// assert_eq!(once, "FY25 Plan\n\nI. Overview text");
    /// assert_eq!(cleaner.clean_text(&once), once);
    /// ```
    pub fn clean_text(&self, text: &str) -> String {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let mut text = HORIZONTAL_SPACE.replace_all(&text, " ").into_owned();

        for _ in 0..MAX_PASSES {
            let next = clean_pass(&text);
            if next == text {
                break;
            }
            text = next;
        }
        text
    }
}

fn clean_pass(text: &str) -> String {
    let mut text = text.to_string();
    for pattern in REMOVAL_PATTERNS.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    for (pattern, replacement) in NORMALIZATION_RULES.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    text.trim().to_string()
}
