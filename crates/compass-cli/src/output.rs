//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use compass_domain::{DocumentFailure, ProcessingStatus, ProcessingStatusRecord};
use compass_orchestrator::{RunMode, RunReport};
use compass_store::{ImportStats, TableCounts};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the outcome of a run.
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Table => Ok(self.format_report_table(report)),
        }
    }

    fn format_report_table(&self, report: &RunReport) -> String {
        let mut sections = Vec::new();

        let headline = format!("{} run: {}", mode_label(report.mode), report.summary.summary());
        sections.push(if report.is_clean() {
            self.success(&headline)
        } else {
            self.warning(&headline)
        });

        if let Some(dir) = &report.output_dir {
            sections.push(self.info(&format!("Artifacts written under {}", dir.display())));
        }
        if !report.skipped.is_empty() {
            sections.push(self.info(&format!("{} unsupported file(s) skipped", report.skipped.len())));
        }
        if let Some(stats) = &report.import {
            sections.push(import_table(stats));
        }
        if !report.failures.is_empty() {
            sections.push(failure_table(&report.failures));
        }

        sections.join("\n")
    }

    /// Format table counts and the status ledger.
    pub fn format_status(&self, counts: &TableCounts, records: &[ProcessingStatusRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "counts": counts,
                "statuses": records,
            }))?),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Plans", "Components", "Provisions", "Tags", "Statuses"]);
                builder.push_record([
                    counts.plans.to_string(),
                    counts.components.to_string(),
                    counts.provisions.to_string(),
                    counts.tags.to_string(),
                    counts.statuses.to_string(),
                ]);
                let mut out = render(builder);

                if records.is_empty() {
                    out.push('\n');
                    out.push_str(&self.colorize("No files recorded.", "yellow"));
                    return Ok(out);
                }

                let mut builder = Builder::default();
                builder.push_record(["File", "Status", "Updated", "Error"]);
                for record in records {
                    builder.push_record([
                        record.file_path.clone(),
                        self.status_label(record.status),
                        record.updated_at.clone(),
                        record.error_message.clone().unwrap_or_default(),
                    ]);
                }
                out.push('\n');
                out.push_str(&render(builder));
                Ok(out)
            }
        }
    }

    fn status_label(&self, status: ProcessingStatus) -> String {
        let color = match status {
            ProcessingStatus::Completed => "green",
            ProcessingStatus::Failed => "red",
            ProcessingStatus::Pending => "yellow",
        };
        self.colorize(status.as_str(), color)
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn mode_label(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Full => "Full",
        RunMode::CleanOnly => "Clean-only",
        RunMode::ImportOnly => "Import-only",
    }
}

fn import_table(stats: &ImportStats) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Plans", "Components", "Provisions", "Tags", "Succeeded", "Failed", "Already done"]);
    builder.push_record([
        stats.plans_imported.to_string(),
        stats.components_imported.to_string(),
        stats.provisions_imported.to_string(),
        stats.tags_imported.to_string(),
        stats.succeeded.to_string(),
        stats.failed.to_string(),
        stats.already_completed.to_string(),
    ]);
    render(builder)
}

fn failure_table(failures: &[DocumentFailure]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["File", "Stage", "Kind", "Message"]);
    for failure in failures {
        builder.push_record([
            failure.file.clone(),
            failure.stage.to_string(),
            failure.kind.to_string(),
            failure.message.clone(),
        ]);
    }
    render(builder)
}

fn render(builder: Builder) -> String {
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_domain::{FailureKind, Stage};
    use compass_orchestrator::ProgressSnapshot;
    use std::time::Duration;

    fn report() -> RunReport {
        RunReport {
            mode: RunMode::Full,
            summary: ProgressSnapshot::new(3, 3, 1, Duration::from_millis(1500)),
            skipped: Vec::new(),
            failures: vec![DocumentFailure::new(
                "plans/c.txt",
                Stage::Extract,
                FailureKind::TerminalExtraction,
                "Invalid response format",
            )],
            import: Some(ImportStats {
                plans_imported: 2,
                succeeded: 2,
                failed: 1,
                ..ImportStats::default()
            }),
            output_dir: None,
        }
    }

    #[test]
    fn test_json_report() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_report(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["mode"], "full");
        assert_eq!(value["import"]["plansImported"], 2);
    }

    #[test]
    fn test_table_report_lists_failures() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&report()).unwrap();
        assert!(output.starts_with("⚠ Full run"));
        assert!(output.contains("plans/c.txt"));
        assert!(output.contains("Invalid response format"));
        assert!(output.contains("Already done"));
    }

    #[test]
    fn test_empty_status() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_status(&TableCounts::default(), &[]).unwrap();
        assert!(output.contains("Plans"));
        assert!(output.contains("No files recorded"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
        assert_eq!(formatter.error("bad"), "✗ bad");
    }
}
