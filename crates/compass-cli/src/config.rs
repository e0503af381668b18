//! Configuration management for the CLI.
//!
//! One [`RunConfig`] is resolved per invocation: file values first, then
//! command-line overrides, then validation. Nothing downstream re-reads
//! the environment except for the Gemini key fallback.

use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use compass_extractor::ExtractorConfig;
use compass_ingest::CleanerConfig;
use compass_llm::gemini::API_KEY_ENV;
use compass_llm::ollama::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};
use compass_orchestrator::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory of source documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,

    /// Root of the raw/cleaned/processed artifact tree
    pub output_dir: PathBuf,

    /// Generative-text provider
    pub provider: ProviderConfig,

    /// Extraction settings
    pub extractor: ExtractorConfig,

    /// Batch settings
    pub orchestrator: OrchestratorConfig,

    /// Cleaning settings
    pub cleaner: CleanerConfig,

    /// Database settings
    pub store: StoreConfig,

    /// Presentation settings
    pub settings: Settings,
}

/// Which provider to call and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider kind
    pub kind: ProviderKind,

    /// Endpoint override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Gemini API key; falls back to the environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Provider kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama server
    #[default]
    Ollama,
    /// Google Gemini API
    Gemini,
}

/// Database settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file
    pub path: PathBuf,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enable colored output
    pub color: bool,

    /// Default output format
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    #[default]
    Table,
    /// JSON format
    Json,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            output_dir: PathBuf::from("output"),
            provider: ProviderConfig::default(),
            extractor: ExtractorConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            cleaner: CleanerConfig::default(),
            store: StoreConfig::default(),
            settings: Settings::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Ollama,
            endpoint: None,
            api_key: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("compass.db"),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

impl ProviderConfig {
    /// Endpoint to use, falling back to the provider's default
    pub fn endpoint_or_default(&self) -> String {
        match (&self.endpoint, self.kind) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, ProviderKind::Ollama) => DEFAULT_ENDPOINT.to_string(),
            (None, ProviderKind::Gemini) => compass_llm::gemini::DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Gemini key from the file, else from the environment
    pub fn gemini_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
    }
}

impl RunConfig {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".compass").join("config.toml"))
    }

    /// Load configuration from `explicit`, or the default path, or defaults.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(CliError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )))
            }
            Some(path) => path.to_path_buf(),
            None => Self::path()?,
        };

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            Self::from_toml(&contents)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Write to `path`, creating its parent directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Fold command-line overrides into the file configuration.
    pub fn apply_run_args(&mut self, args: &RunArgs) {
        if let Some(input) = &args.input {
            self.input_dir = Some(input.clone());
        }
        if let Some(output) = &args.output {
            self.output_dir = output.clone();
        }
        if let Some(model) = &args.model {
            self.extractor.model = model.clone();
        }
        if let Some(provider) = args.provider {
            self.provider.kind = provider.into();
        }
        if let Some(endpoint) = &args.endpoint {
            self.provider.endpoint = Some(endpoint.clone());
        }
        if let Some(workers) = args.workers {
            self.orchestrator.concurrency = workers;
        }
        if let Some(db) = &args.db {
            self.store.path = db.clone();
        }
        if args.skip_db {
            self.orchestrator.persist = false;
        }
        if args.sequential {
            self.orchestrator.sequential = true;
        }
        if args.replace {
            self.orchestrator.replace = true;
        }
    }

    /// Validate every section.
    ///
    /// `needs_provider` is false for runs that never call the provider, so a
    /// missing Gemini key does not block clean-only or import-only runs.
    pub fn validate(&self, needs_provider: bool) -> Result<()> {
        self.extractor.validate().map_err(CliError::Config)?;
        self.orchestrator.validate().map_err(CliError::Config)?;
        self.cleaner.validate().map_err(CliError::Config)?;

        if self.output_dir.as_os_str().is_empty() {
            return Err(CliError::Config("output_dir must not be empty".into()));
        }
        if self.orchestrator.persist && self.store.path.as_os_str().is_empty() {
            return Err(CliError::Config("store.path must not be empty".into()));
        }

        if needs_provider && self.provider.kind == ProviderKind::Gemini && self.provider.gemini_api_key().is_none() {
            return Err(CliError::Config(format!(
                "Gemini provider needs an api_key in the config file or {} in the environment",
                API_KEY_ENV
            )));
        }
        Ok(())
    }

    /// Per-call timeout handed to the HTTP client
    pub fn request_timeout_secs(&self) -> u64 {
        if self.extractor.request_timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            self.extractor.request_timeout_secs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ProviderArg;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate(true).is_ok());
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.store.path, PathBuf::from("compass.db"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RunConfig::from_toml(
            r#"
output_dir = "out"

[orchestrator]
concurrency = 8

[provider]
kind = "gemini"
api_key = "k"
"#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.orchestrator.concurrency, 8);
        assert_eq!(config.orchestrator.pacing_delay_ms, 250);
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.extractor.model, ExtractorConfig::default().model);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = RunConfig::default();
        config.provider.endpoint = Some("http://gpu-box:11434".to_string());
        let parsed = RunConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config = RunConfig::default();
        let args = RunArgs {
            input: Some(PathBuf::from("plans")),
            model: Some("gemini-1.5-pro".to_string()),
            provider: Some(ProviderArg::Gemini),
            workers: Some(2),
            skip_db: true,
            sequential: true,
            ..RunArgs::default()
        };
        config.apply_run_args(&args);

        assert_eq!(config.input_dir, Some(PathBuf::from("plans")));
        assert_eq!(config.extractor.model, "gemini-1.5-pro");
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.orchestrator.concurrency, 2);
        assert!(!config.orchestrator.persist);
        assert!(config.orchestrator.sequential);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = RunConfig::default();
        config.orchestrator.concurrency = 0;
        assert!(matches!(config.validate(true), Err(CliError::Config(_))));
    }

    #[test]
    fn test_gemini_key_from_file() {
        let mut config = RunConfig::default();
        config.provider.kind = ProviderKind::Gemini;
        config.provider.api_key = Some("from-file".to_string());
        assert_eq!(config.provider.gemini_api_key().as_deref(), Some("from-file"));
        assert!(config.validate(true).is_ok());
    }

    #[test]
    fn test_missing_gemini_key_ignored_without_provider() {
        let mut config = RunConfig::default();
        config.provider.kind = ProviderKind::Gemini;
        config.provider.api_key = Some("  ".to_string());
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = RunConfig::load(Some(Path::new("/no/such/compass.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = RunConfig::default();
        config.orchestrator.concurrency = 6;
        config.save(&path).unwrap();

        let loaded = RunConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.orchestrator.concurrency, 6);
    }

    #[test]
    fn test_endpoint_fallback() {
        let provider = ProviderConfig::default();
        assert_eq!(provider.endpoint_or_default(), DEFAULT_ENDPOINT);
    }
}
