//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::RunConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::{Path, PathBuf};

/// Execute the config command.
///
/// `explicit` is the `--config` path, if one was given.
pub fn execute_config(
    args: ConfigArgs,
    config: &RunConfig,
    explicit: Option<&Path>,
    formatter: &Formatter,
) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            let path = init_config(explicit, force)?;
            println!("{}", formatter.success(&format!("Wrote {}", path.display())));
        }
    }
    Ok(())
}

/// Write a default configuration file and return its path.
pub fn init_config(explicit: Option<&Path>, force: bool) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => RunConfig::path()?,
    };
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    RunConfig::default().save(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        init_config(Some(&path), false).unwrap();
        assert!(RunConfig::load(Some(&path)).is_ok());
        assert!(init_config(Some(&path), false).is_err());
        assert!(init_config(Some(&path), true).is_ok());
    }
}
