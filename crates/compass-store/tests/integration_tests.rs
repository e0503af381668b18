//! Integration tests for compass-store
//!
//! These tests verify transactional writes, the status ledger and batch
//! import counters against an in-memory database.

use compass_domain::{
    ExtractionResult, ExtractionSchema, ProcessingStatus, RawDocument, SourceRef,
};
use compass_store::{BatchImporter, ImportOptions, PersistOutcome, SqliteStore, TableCounts};

fn source(path: &str) -> SourceRef {
    RawDocument::new(path, "text", 1).source_ref()
}

fn payload(json: &str) -> ExtractionSchema {
    serde_json::from_str(json).unwrap()
}

const EXAMPLE: &str = r#"{
    "planTitle": "FY25 Plan",
    "effectiveDates": {"startDate": "Jan 1, 2025", "endDate": "Dec 31, 2025"},
    "compensationComponents": [
        {"name": "Bonus", "type": "Bonus", "targetAmount": "$10,000", "frequency": "Quarterly",
         "structure": "...", "metrics": []}
    ],
    "specialProvisions": []
}"#;

const RICH: &str = r#"{
    "planTitle": "FY25 Enterprise AE Plan",
    "effectiveDates": {"startDate": "Feb 1, 2025", "endDate": "Jan 31, 2026"},
    "planSummary": "Quota-carrying enterprise sellers",
    "compensationComponents": [
        {"name": "New Logo Commission", "type": "Commission", "targetAmount": "$75K",
         "frequency": "Monthly", "structure": {"rate": "8%", "accelerator": "1.5x above 100%"},
         "metrics": "Bookings", "weight": 0.7, "tags": ["new-business", "accelerated"]},
        {"name": "MBO Bonus", "type": "Bonus", "targetAmount": "$25,000", "frequency": "Annual",
         "structure": "Discretionary", "metrics": ["MBO attainment", "CSAT"], "tags": ["mbo"]},
        "Recoverable Draw"
    ],
    "payoutSchedule": "Paid the month after close",
    "specialProvisions": [
        "Windfall deals above $1M are reviewed by the comp committee",
        "True-up at fiscal year end"
    ]
}"#;

#[test]
fn test_end_to_end_example_counts() {
    let mut store = SqliteStore::in_memory().unwrap();
    let result = ExtractionResult::success(source("plans/fy25.txt"), payload(EXAMPLE));

    let outcome = store.persist_result(&result, false).unwrap();
    assert!(matches!(outcome, PersistOutcome::Written { components: 1, provisions: 0, tags: 0, .. }));

    assert_eq!(
        store.counts().unwrap(),
        TableCounts {
            plans: 1,
            components: 1,
            provisions: 0,
            tags: 0,
            statuses: 1,
        }
    );
    let status = store.status("plans/fy25.txt").unwrap().unwrap();
    assert_eq!(status.status, ProcessingStatus::Completed);
    assert!(status.error_message.is_none());

    let plan = store.plan_for_source("plans/fy25.txt").unwrap().unwrap();
    assert_eq!(plan.title, "FY25 Plan");
    assert_eq!(plan.effective_dates.end_date, "Dec 31, 2025");
    assert_eq!(plan.total_target, Some(10_000.0));
}

#[test]
fn test_persisting_twice_is_idempotent() {
    let mut store = SqliteStore::in_memory().unwrap();
    let result = ExtractionResult::success(source("plans/rich.txt"), payload(RICH));

    store.persist_result(&result, false).unwrap();
    let first = store.counts().unwrap();

    let second = store.persist_result(&result, false).unwrap();
    assert_eq!(second, PersistOutcome::AlreadyCompleted);
    assert_eq!(store.counts().unwrap(), first);
    assert_eq!(store.statuses().unwrap().len(), 1);
}

#[test]
fn test_replace_rewrites_rows() {
    let mut store = SqliteStore::in_memory().unwrap();
    let result = ExtractionResult::success(source("plans/rich.txt"), payload(RICH));

    store.persist_result(&result, false).unwrap();
    let before = store.counts().unwrap();
    let first_plan = store.plan_for_source("plans/rich.txt").unwrap().unwrap();

    store.persist_result(&result, true).unwrap();
    assert_eq!(store.counts().unwrap(), before);

    let second_plan = store.plan_for_source("plans/rich.txt").unwrap().unwrap();
    assert_ne!(first_plan.id, second_plan.id);
}

#[test]
fn test_structured_and_legacy_components() {
    let mut store = SqliteStore::in_memory().unwrap();
    let result = ExtractionResult::success(source("plans/rich.txt"), payload(RICH));
    store.persist_result(&result, false).unwrap();

    let plan = store.plan_for_source("plans/rich.txt").unwrap().unwrap();
    assert_eq!(plan.total_target, Some(100_000.0));
    assert_eq!(plan.payout_schedule, "Paid the month after close");

    let components = store.components(plan.id).unwrap();
    assert_eq!(components.len(), 3);

    // Single-string metrics are normalized into a list
    assert_eq!(components[0].metrics, vec!["Bookings".to_string()]);
    assert_eq!(components[0].weight, Some(0.7));
    assert_eq!(components[0].structure["rate"], "8%");
    assert_eq!(components[1].metrics, vec!["MBO attainment", "CSAT"]);

    // Legacy form keeps only the name
    let legacy = &components[2];
    assert_eq!(legacy.name, "Recoverable Draw");
    assert!(legacy.kind.is_empty() && legacy.target_amount.is_empty());
    assert!(legacy.metrics.is_empty());
    assert!(legacy.structure.is_null());

    let tags: Vec<_> = store
        .tags(components[0].id)
        .unwrap()
        .into_iter()
        .map(|t| t.tag)
        .collect();
    assert_eq!(tags, vec!["new-business", "accelerated"]);
    assert!(store.tags(legacy.id).unwrap().is_empty());

    let provisions = store.provisions(plan.id).unwrap();
    assert_eq!(provisions.len(), 2);
    assert!(provisions[0].text.starts_with("Windfall"));

    let counts = store.counts().unwrap();
    assert_eq!(counts.tags, 3);
}

#[test]
fn test_failed_write_rolls_back_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compass.db");
    drop(SqliteStore::new(&path).unwrap());

    // Make the last insert of the transaction fail
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_tag BEFORE INSERT ON tags WHEN NEW.tag = 'explode'
         BEGIN SELECT RAISE(ABORT, 'tag write rejected'); END;",
    )
    .unwrap();
    drop(conn);

    let broken = payload(
        r#"{
            "planTitle": "Broken",
            "effectiveDates": {"startDate": "", "endDate": ""},
            "compensationComponents": [
                {"name": "Bonus", "tags": ["ok"]},
                {"name": "MBO", "tags": ["explode"]}
            ],
            "specialProvisions": ["Some provision"]
        }"#,
    );
    let result = ExtractionResult::success(source("plans/broken.txt"), broken);

    let store = SqliteStore::new(&path).unwrap();
    let mut importer = BatchImporter::new(store, ImportOptions::default());
    assert!(importer.import(&result).is_err());
    assert_eq!(importer.stats().failed, 1);

    let store = importer.into_store();
    let counts = store.counts().unwrap();
    assert_eq!((counts.plans, counts.components, counts.provisions, counts.tags), (0, 0, 0, 0));

    let status = store.status("plans/broken.txt").unwrap().unwrap();
    assert_eq!(status.status, ProcessingStatus::Failed);
    assert!(status.error_message.unwrap().contains("tag write rejected"));
}

#[test]
fn test_blank_component_name_is_persisted() {
    let mut store = SqliteStore::in_memory().unwrap();
    let blank = payload(
        r#"{
            "planTitle": "Blank names",
            "effectiveDates": {"startDate": "", "endDate": ""},
            "compensationComponents": [{"name": "   ", "tags": ["a"]}, ""],
            "specialProvisions": []
        }"#,
    );
    let result = ExtractionResult::success(source("plans/blank.txt"), blank);

    store.persist_result(&result, false).unwrap();

    let counts = store.counts().unwrap();
    assert_eq!((counts.plans, counts.components, counts.tags), (1, 2, 1));
    assert_eq!(
        store.status("plans/blank.txt").unwrap().unwrap().status,
        ProcessingStatus::Completed
    );
}

#[test]
fn test_error_results_never_touch_the_store() {
    let store = SqliteStore::in_memory().unwrap();
    let mut importer = BatchImporter::new(store, ImportOptions::default());

    let results = vec![
        ExtractionResult::success(source("plans/a.txt"), payload(EXAMPLE)),
        ExtractionResult::failure(source("plans/b.txt"), "Invalid response format"),
    ];
    let stats = importer.import_all(&results);

    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.plans_imported, 1);
    assert!(importer.store().status("plans/b.txt").unwrap().is_none());
    assert_eq!(importer.store().counts().unwrap().statuses, 1);
}

#[test]
fn test_record_skipped_counts_and_marks_failed() {
    let store = SqliteStore::in_memory().unwrap();
    let mut importer = BatchImporter::new(store, ImportOptions::default());
    importer.begin();

    importer.import(&ExtractionResult::success(source("plans/a.txt"), payload(EXAMPLE))).unwrap();
    importer.record_skipped("plans/b.txt", "Invalid response format");
    importer.record_skipped("plans/a.txt", "Not started: run aborted");

    let stats = importer.stats();
    assert_eq!((stats.succeeded, stats.failed), (1, 2));

    let store = importer.store();
    let b = store.status("plans/b.txt").unwrap().unwrap();
    assert_eq!(b.status, ProcessingStatus::Failed);
    assert_eq!(b.error_message.as_deref(), Some("Invalid response format"));
    assert_eq!(store.status("plans/a.txt").unwrap().unwrap().status, ProcessingStatus::Completed);
    assert_eq!(store.counts().unwrap().plans, 1);
}

#[test]
fn test_import_counters_reset_per_batch() {
    let store = SqliteStore::in_memory().unwrap();
    let mut importer = BatchImporter::new(store, ImportOptions::default());

    let first = vec![ExtractionResult::success(source("plans/rich.txt"), payload(RICH))];
    let stats = importer.import_all(&first);
    assert_eq!(stats.plans_imported, 1);
    assert_eq!(stats.components_imported, 3);
    assert_eq!(stats.tags_imported, 3);

    let second = vec![ExtractionResult::success(source("plans/a.txt"), payload(EXAMPLE))];
    let stats = importer.import_all(&second);
    assert_eq!(stats.plans_imported, 1);
    assert_eq!(stats.components_imported, 1);
    assert_eq!(stats.tags_imported, 0);
    assert_eq!(stats.succeeded, 1);
}

#[test]
fn test_completed_status_survives_later_failure() {
    let mut store = SqliteStore::in_memory().unwrap();
    let result = ExtractionResult::success(source("plans/a.txt"), payload(EXAMPLE));
    store.persist_result(&result, false).unwrap();

    store.mark_failed("plans/a.txt", "rerun timed out").unwrap();

    let status = store.status("plans/a.txt").unwrap().unwrap();
    assert_eq!(status.status, ProcessingStatus::Completed);
}

#[test]
fn test_failed_file_can_complete_on_rerun() {
    let mut store = SqliteStore::in_memory().unwrap();
    store.mark_failed("plans/a.txt", "timed out").unwrap();

    let result = ExtractionResult::success(source("plans/a.txt"), payload(EXAMPLE));
    store.persist_result(&result, false).unwrap();

    let status = store.status("plans/a.txt").unwrap().unwrap();
    assert_eq!(status.status, ProcessingStatus::Completed);
    assert!(status.error_message.is_none());
    assert_eq!(store.statuses().unwrap().len(), 1);
}

#[test]
fn test_delete_cascades_to_children() {
    let mut store = SqliteStore::in_memory().unwrap();
    let result = ExtractionResult::success(source("plans/rich.txt"), payload(RICH));
    store.persist_result(&result, false).unwrap();

    assert_eq!(store.delete_plans_for("plans/rich.txt").unwrap(), 1);

    let counts = store.counts().unwrap();
    assert_eq!((counts.plans, counts.components, counts.provisions, counts.tags), (0, 0, 0, 0));
}

#[test]
fn test_persist_rejects_error_result() {
    let mut store = SqliteStore::in_memory().unwrap();
    let result = ExtractionResult::failure(source("plans/x.txt"), "boom");
    assert!(store.persist_result(&result, false).is_err());
    assert_eq!(store.counts().unwrap(), TableCounts::default());
}

#[test]
fn test_on_disk_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compass.db");

    {
        let mut store = SqliteStore::new(&path).unwrap();
        let result = ExtractionResult::success(source("plans/a.txt"), payload(EXAMPLE));
        store.persist_result(&result, false).unwrap();
    }

    let store = SqliteStore::new(&path).unwrap();
    assert_eq!(store.plans().unwrap().len(), 1);
}
