//! Load-and-clean tests over real directories

use compass_domain::{FailureKind, Stage};
use compass_ingest::{CleanerConfig, DocumentLoader, PlainTextSource, TextCleaner};
use std::fs;

const PLAN_TEXT: &str = "FY25 Confidential Plan effective Jan 1, 2025 through Dec 31, 2025.\n\n\n\
I. Overview\nField sales plan.\n\nPage 1 of 2\n\
II. Quarterly Bonus\nBonus of $10,000 paid Quarterly.\n";

#[tokio::test]
async fn test_corrupt_file_does_not_stop_siblings() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a_plan.txt"), PLAN_TEXT).unwrap();
    fs::write(dir.path().join("b_corrupt.txt"), [0xc3u8, 0x28, 0xa0, 0xa1]).unwrap();
    fs::write(dir.path().join("c_plan.md"), "Commission memo").unwrap();

    let report = DocumentLoader::new(PlainTextSource::new())
        .load_dir(dir.path())
        .await
        .unwrap();

    let titles: Vec<_> = report.documents.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["a plan", "c plan"]);

    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert!(failure.file.ends_with("b_corrupt.txt"));
    assert_eq!(failure.stage, Stage::Load);
    assert_eq!(failure.kind, FailureKind::Ingestion);
}

#[tokio::test]
async fn test_loaded_documents_clean_with_hints() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("fy25.txt"), PLAN_TEXT).unwrap();

    let report = DocumentLoader::new(PlainTextSource::new())
        .load_dir(dir.path())
        .await
        .unwrap();
    let raw = &report.documents[0];
    assert_eq!(raw.char_count, PLAN_TEXT.chars().count());
    assert_eq!(raw.page_count, 1);

    let cleaned = TextCleaner::new(CleanerConfig::default()).clean(raw);
    assert!(!cleaned.cleaned_text.contains("Confidential"));
    assert!(!cleaned.cleaned_text.contains("Page 1 of 2"));
    assert!(!cleaned.cleaned_text.contains("\n\n\n"));
    assert_eq!(cleaned.source_ref.path, raw.source_path);

    let hints = cleaned.structural_hints.expect("hints");
    assert_eq!(hints.candidate_components, vec!["Quarterly Bonus"]);
    assert_eq!(hints.sections.len(), 2);
}
