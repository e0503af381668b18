//! Documents as they move through the load and clean stages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for a loaded document, based on UUIDv7
///
/// UUIDv7 keeps identifiers sortable by ingest time, which makes artifact
/// listings and logs read chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DocumentId(u128);

impl DocumentId {
    /// Generate a new UUIDv7-based DocumentId
    ///
    /// # Examples
    ///
    /// ```
    /// use compass_domain::DocumentId;
    ///
    /// let id = DocumentId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a DocumentId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a DocumentId from its hyphenated string form
    pub fn parse(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid document id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for DocumentId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Reference back to the source file a document came from
///
/// Carried through every stage so that failures and persisted rows can be
/// traced to the exact input file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    /// Identifier assigned at load time
    pub id: DocumentId,

    /// Path of the source file
    pub path: PathBuf,

    /// Human-readable title (the file stem)
    pub title: String,
}

impl SourceRef {
    /// Key used for the processing status ledger and `Plan.source_file`
    pub fn key(&self) -> String {
        self.path.display().to_string()
    }

    /// File stem used to name stage artifacts
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Unmodified text extracted from one source file
///
/// Created by the loader, consumed once by the cleaner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    /// Unique identifier
    pub id: DocumentId,

    /// Path of the source file
    pub source_path: PathBuf,

    /// Title derived from the file name
    pub title: String,

    /// Extracted text, untouched
    pub raw_text: String,

    /// Number of characters in `raw_text`
    pub char_count: usize,

    /// Number of pages or segments the text was extracted from
    pub page_count: usize,

    /// When the document was loaded (seconds since Unix epoch)
    pub ingest_timestamp: u64,
}

impl RawDocument {
    /// Create a raw document, stamping it with a fresh id and the current time
    pub fn new(source_path: impl Into<PathBuf>, raw_text: impl Into<String>, page_count: usize) -> Self {
        let source_path = source_path.into();
        let raw_text = raw_text.into();
        let title = title_from_path(&source_path);
        let ingest_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            id: DocumentId::new(),
            char_count: raw_text.chars().count(),
            source_path,
            title,
            raw_text,
            page_count,
            ingest_timestamp,
        }
    }

    /// Reference to this document's source
    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            id: self.id,
            path: self.source_path.clone(),
            title: self.title.clone(),
        }
    }
}

fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace(['_', '-'], " "))
        .unwrap_or_default()
}

/// Character counts before and after cleaning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReductionStats {
    /// Length of the raw text in characters
    pub original_length: usize,

    /// Length of the cleaned text in characters
    pub cleaned_length: usize,

    /// Percentage of characters removed, in [0, 100]
    pub reduction_pct: f64,
}

impl ReductionStats {
    /// Compute stats from the two lengths
    ///
    /// # Examples
    ///
    /// ```
    /// use compass_domain::ReductionStats;
    ///
    /// let stats = ReductionStats::compute(200, 150);
    /// assert_eq!(stats.reduction_pct, 25.0);
    ///
    /// let unchanged = ReductionStats::compute(0, 0);
    /// assert_eq!(unchanged.reduction_pct, 0.0);
    /// ```
    pub fn compute(original_length: usize, cleaned_length: usize) -> Self {
        let reduction_pct = if original_length == 0 {
            0.0
        } else {
            let removed = original_length.saturating_sub(cleaned_length) as f64;
            removed / original_length as f64 * 100.0
        };

        Self {
            original_length,
            cleaned_length,
            reduction_pct,
        }
    }
}

/// A raw document after boilerplate removal and whitespace normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanedDocument {
    /// Source this text came from
    pub source_ref: SourceRef,

    /// Cleaned text handed to the extractor
    pub cleaned_text: String,

    /// How much the cleaner removed
    pub reduction_stats: ReductionStats,

    /// Advisory structure found by heuristics; never authoritative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structural_hints: Option<StructuralHints>,
}

/// Best-effort structure located in cleaned text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralHints {
    /// Probable plan title
    pub title: Option<String>,

    /// Probable "effective ... through ..." period
    pub effective_period: Option<EffectivePeriodHint>,

    /// Sections delimited by Roman-numeral markers
    pub sections: Vec<SectionHint>,

    /// Headings of sections that look like compensation components
    pub candidate_components: Vec<String>,

    /// Every monetary-looking substring, in document order
    pub monetary_values: Vec<String>,

    /// Every percentage-looking substring, in document order
    pub percentages: Vec<String>,
}

/// Start and end of a plan period as written in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePeriodHint {
    /// Text of the start date
    pub start: String,

    /// Text of the end date
    pub end: String,
}

/// A block of text introduced by a Roman-numeral marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionHint {
    /// The numeral, e.g. "IV"
    pub marker: String,

    /// Heading text following the marker
    pub heading: String,

    /// Body text up to the next marker
    pub body: String,

    /// Heading mentions bonus, commission, draw or incentive
    pub candidate_component: bool,
}
