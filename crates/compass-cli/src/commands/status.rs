//! Status command implementation.

use crate::cli::StatusArgs;
use crate::config::RunConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use compass_domain::ProcessingStatus;
use compass_store::SqliteStore;

/// Execute the status command.
pub fn execute_status(args: StatusArgs, config: &RunConfig, formatter: &Formatter) -> Result<()> {
    println!("{}", status_report(&args, config, formatter)?);
    Ok(())
}

/// Render table counts and the ledger for the configured database.
pub fn status_report(args: &StatusArgs, config: &RunConfig, formatter: &Formatter) -> Result<String> {
    let path = args.db.as_ref().unwrap_or(&config.store.path);
    if !path.exists() {
        return Err(CliError::InvalidInput(format!("Database not found: {}", path.display())));
    }

    let store = SqliteStore::new(path)?;
    let counts = store.counts()?;
    let mut records = store.statuses()?;
    if args.failed {
        records.retain(|r| r.status == ProcessingStatus::Failed);
    }

    formatter.format_status(&counts, &records)
}
