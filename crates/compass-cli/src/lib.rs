//! Compass CLI library.
//!
//! Argument parsing, configuration resolution, command execution and
//! output formatting for the `compass` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;

pub use cli::{Cli, Command};
pub use config::RunConfig;
pub use error::{CliError, Result};
pub use output::Formatter;
