//! Advisory structural annotation
//!
//! Heuristics that locate a title, an effective-date phrase, Roman-numeral
//! sections, and money/percentage substrings. The extractor is authoritative;
//! these hints only travel alongside the cleaned text.

use compass_domain::{EffectivePeriodHint, SectionHint, StructuralHints};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_TITLE_CHARS: usize = 200;
const MAX_HEADING_CHARS: usize = 80;
const COMPONENT_KEYWORDS: &[&str] = &["bonus", "commission", "draw", "incentive"];

static EFFECTIVE_PERIOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\beffective\s+(?:from\s+|as\s+of\s+)?([^\n.;]+?)\s+(?:through|thru|to|until)\s+([^\n.;]+)",
    )
    .unwrap()
});

static SECTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([IVX]{1,6})\.[ \t]+([A-Z])").unwrap());

static MONEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s?\d[\d,]*(?:\.\d+)?(?:\s?[KkMm]\b)?").unwrap()
});

static PERCENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?\s?%").unwrap());

/// Why annotation was skipped
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HintError {
    /// Nothing to annotate
    #[error("text is empty")]
    Empty,

    /// Text exceeds the annotation ceiling
    #[error("text is {len} chars, annotation limit is {max}")]
    TooLarge {
        /// Text length
        len: usize,
        /// Configured ceiling
        max: usize,
    },
}

/// Derive structural hints from cleaned text
///
/// # Examples
///
/// ```
/// use compass_ingest::annotate;
///
/// let hints = annotate(
///     "FY25 Plan effective Jan 1, 2025 through Dec 31, 2025.\nII. Bonus Plan: $5,000 at 100%",
///     10_000,
/// )
/// .unwrap();
/// assert_eq!(hints.title.as_deref(), Some("FY25 Plan"));
/// assert_eq!(hints.candidate_components, vec!["Bonus Plan"]);
/// assert_eq!(hints.percentages, vec!["100%"]);
/// ```
pub fn annotate(text: &str, max_chars: usize) -> Result<StructuralHints, HintError> {
    if text.trim().is_empty() {
        return Err(HintError::Empty);
    }
    let len = text.chars().count();
    if len > max_chars {
        return Err(HintError::TooLarge { len, max: max_chars });
    }

    let sections = find_sections(text);
    let candidate_components = sections
        .iter()
        .filter(|s| s.candidate_component)
        .map(|s| s.heading.clone())
        .collect();

    Ok(StructuralHints {
        title: find_title(text),
        effective_period: find_effective_period(text),
        sections,
        candidate_components,
        monetary_values: collect(&MONEY, text),
        percentages: collect(&PERCENT, text),
    })
}

fn find_title(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;

    let cut = line
        .to_lowercase()
        .find(" effective ")
        .filter(|idx| line.is_char_boundary(*idx))
        .map(|idx| &line[..idx])
        .unwrap_or(line);

    let title: String = cut.trim().chars().take(MAX_TITLE_CHARS).collect();
    (!title.is_empty()).then_some(title)
}

fn find_effective_period(text: &str) -> Option<EffectivePeriodHint> {
    let caps = EFFECTIVE_PERIOD.captures(text)?;
    Some(EffectivePeriodHint {
        start: caps.get(1)?.as_str().trim().to_string(),
        end: caps.get(2)?.as_str().trim().to_string(),
    })
}

fn find_sections(text: &str) -> Vec<SectionHint> {
    let markers: Vec<(usize, usize, String)> = SECTION_MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let heading_start = caps.get(2)?.start();
            Some((whole.start(), heading_start, caps.get(1)?.as_str().to_string()))
        })
        .collect();

    markers
        .iter()
        .enumerate()
        .map(|(i, (_, heading_start, marker))| {
            let end = markers.get(i + 1).map(|m| m.0).unwrap_or(text.len());
            let block = &text[*heading_start..end];

            let heading_end = block.find(['\n', '.', ':']).unwrap_or(block.len());
            let heading: String = block[..heading_end]
                .trim()
                .chars()
                .take(MAX_HEADING_CHARS)
                .collect();
            let body = block[heading_end..]
                .trim_start_matches(['.', ':'])
                .trim()
                .to_string();

            let lowered = heading.to_lowercase();
            let candidate_component = COMPONENT_KEYWORDS.iter().any(|k| lowered.contains(k));

            SectionHint {
                marker: marker.clone(),
                heading,
                body,
                candidate_component,
            }
        })
        .collect()
}

fn collect(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .collect()
}
