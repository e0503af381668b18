//! Text source for plain-text and script-like files

use crate::IngestError;
use async_trait::async_trait;
use compass_domain::traits::{ExtractedText, TextSource};
use std::path::Path;

/// Extensions read directly as UTF-8 text
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "rst", "script"];

const FORM_FEED: char = '\u{000C}';

/// Reads UTF-8 text files; form feeds mark page breaks
#[derive(Debug, Clone, Default)]
pub struct PlainTextSource {
    extensions: Vec<String>,
}

impl PlainTextSource {
    /// Source accepting [`SUPPORTED_EXTENSIONS`]
    pub fn new() -> Self {
        Self {
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Also accept files with `extension`
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extensions.push(extension.into().to_lowercase());
        self
    }
}

#[async_trait]
impl TextSource for PlainTextSource {
    type Error = IngestError;

    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    async fn extract_text(&self, path: &Path) -> Result<ExtractedText, Self::Error> {
        let bytes = tokio::fs::read(path).await.map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let text = String::from_utf8(bytes).map_err(|_| IngestError::Corrupt(path.to_path_buf()))?;
        let page_count = text.split(FORM_FEED).filter(|p| !p.trim().is_empty()).count().max(1);

        Ok(ExtractedText {
            text: text.replace(FORM_FEED, "\n\n"),
            page_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_supports_by_extension() {
        let source = PlainTextSource::new();
        assert!(source.supports(&PathBuf::from("plan.txt")));
        assert!(source.supports(&PathBuf::from("PLAN.MD")));
        assert!(!source.supports(&PathBuf::from("plan.pdf")));
        assert!(!source.supports(&PathBuf::from("README")));
    }

    #[test]
    fn test_custom_extension() {
        let source = PlainTextSource::new().with_extension("SRT");
        assert!(source.supports(&PathBuf::from("talk.srt")));
    }

    #[tokio::test]
    async fn test_page_count_from_form_feeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.txt");
        std::fs::write(&path, "page one\u{000C}page two\u{000C}page three").unwrap();

        let extracted = PlainTextSource::new().extract_text(&path).await.unwrap();
        assert_eq!(extracted.page_count, 3);
        assert!(!extracted.text.contains(FORM_FEED));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let result = PlainTextSource::new().extract_text(&path).await;
        assert!(matches!(result, Err(IngestError::Corrupt(_))));
    }
}
