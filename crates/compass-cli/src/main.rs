//! Compass CLI - extract structured compensation plans from documents.

use anyhow::Context;
use clap::Parser;
use compass_cli::cli::ConfigAction;
use compass_cli::commands::{self, run::run_mode};
use compass_cli::logging::init_logging;
use compass_cli::{Cli, Command, Formatter, RunConfig};
use compass_orchestrator::RunMode;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // `config init` must work before any file exists
    let creating = matches!(
        &cli.command,
        Command::Config(args) if matches!(args.action, ConfigAction::Init { .. })
    );
    let mut config = if creating {
        RunConfig::default()
    } else {
        RunConfig::load(cli.config.as_deref()).context("Failed to load configuration")?
    };

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Run(args) => {
            let mode = run_mode(&args);
            config.apply_run_args(&args);
            config.validate(mode == RunMode::Full)?;
            commands::execute_run(mode, &config, &formatter).await?;
        }
        Command::Status(args) => {
            commands::execute_status(args, &config, &formatter)?;
        }
        Command::Config(args) => {
            commands::execute_config(args, &config, cli.config.as_deref(), &formatter)?;
        }
    }

    Ok(())
}
