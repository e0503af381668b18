//! CLI command definitions and argument parsing.

use crate::config::{OutputFormat, ProviderKind};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Compass - Extract structured compensation plans from documents.
#[derive(Debug, Parser)]
#[command(name = "compass")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.compass/config.toml)
    #[arg(short, long, global = true, env = "COMPASS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline over a directory of plan documents
    Run(RunArgs),

    /// Show table counts and the processing status ledger
    Status(StatusArgs),

    /// Show or create the configuration file
    Config(ConfigArgs),
}

/// Arguments for the run command.
#[derive(Debug, Default, Parser)]
pub struct RunArgs {
    /// Directory of source documents
    #[arg(short, long, required_unless_present = "import_only")]
    pub input: Option<PathBuf>,

    /// Directory for raw/cleaned/processed artifacts
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Model identifier
    #[arg(short, long)]
    pub model: Option<String>,

    /// Generative-text provider
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Provider endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Maximum extraction calls in flight
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// SQLite database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Extract without writing to the database
    #[arg(long, conflicts_with = "import_only")]
    pub skip_db: bool,

    /// Process documents one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Only load and clean, writing raw and cleaned artifacts
    #[arg(long, conflicts_with_all = ["import_only", "skip_db"])]
    pub clean_only: bool,

    /// Only import processed artifacts from the output directory
    #[arg(long)]
    pub import_only: bool,

    /// Replace previously persisted plans instead of skipping them
    #[arg(long)]
    pub replace: bool,
}

/// Arguments for the status command.
#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// SQLite database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Only list failed files
    #[arg(long)]
    pub failed: bool,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the resolved configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Provider argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ProviderArg {
    /// Local Ollama server
    Ollama,
    /// Google Gemini API
    Gemini,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => OutputFormat::Table,
            CliFormat::Json => OutputFormat::Json,
        }
    }
}

impl From<ProviderArg> for ProviderKind {
    fn from(provider: ProviderArg) -> Self {
        match provider {
            ProviderArg::Ollama => ProviderKind::Ollama,
            ProviderArg::Gemini => ProviderKind::Gemini,
        }
    }
}
