//! Run command implementation.

use crate::cli::RunArgs;
use crate::config::{ProviderKind, RunConfig};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use compass_domain::traits::LlmProvider;
use compass_extractor::SchemaExtractor;
use compass_ingest::{DocumentLoader, PlainTextSource, TextCleaner};
use compass_llm::{GeminiProvider, OllamaProvider};
use compass_orchestrator::{import_only, ArtifactStore, BatchOrchestrator, BatchProgress, Pipeline, RunMode, RunReport};
use compass_store::{BatchImporter, ImportOptions, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Stages selected by the run flags.
pub fn run_mode(args: &RunArgs) -> RunMode {
    if args.import_only {
        RunMode::ImportOnly
    } else if args.clean_only {
        RunMode::CleanOnly
    } else {
        RunMode::Full
    }
}

/// Execute the run command.
pub async fn execute_run(mode: RunMode, config: &RunConfig, formatter: &Formatter) -> Result<()> {
    let report = run(mode, config).await?;
    println!("{}", formatter.format_report(&report)?);
    Ok(())
}

/// Run the selected stages against the configured provider.
pub async fn run(mode: RunMode, config: &RunConfig) -> Result<RunReport> {
    match mode {
        RunMode::CleanOnly => Ok(pipeline(config).clean_only(&input_dir(config)?).await?),
        RunMode::ImportOnly => {
            let mut importer = open_importer(config)?;
            Ok(import_only(&ArtifactStore::new(&config.output_dir), &mut importer).await?)
        }
        RunMode::Full => match config.provider.kind {
            ProviderKind::Ollama => {
                let provider = OllamaProvider::new(config.provider.endpoint_or_default(), config.request_timeout_secs())?;
                run_with_provider(provider, config).await
            }
            ProviderKind::Gemini => {
                let key = config
                    .provider
                    .gemini_api_key()
                    .ok_or_else(|| CliError::Config("Gemini API key is not set".into()))?;
                let mut provider = GeminiProvider::new(key, config.request_timeout_secs())?;
                if let Some(endpoint) = &config.provider.endpoint {
                    provider = provider.with_endpoint(endpoint.clone());
                }
                run_with_provider(provider, config).await
            }
        },
    }
}

/// Full run with an already-built provider.
pub async fn run_with_provider<P: LlmProvider + 'static>(provider: P, config: &RunConfig) -> Result<RunReport> {
    let input = input_dir(config)?;
    let extractor = SchemaExtractor::new(provider, config.extractor.clone())?;
    let orchestrator = BatchOrchestrator::new(extractor, config.orchestrator.clone())?;
    let mut importer = if config.orchestrator.persist {
        Some(open_importer(config)?)
    } else {
        None
    };

    info!(
        input = %input.display(),
        provider = %provider_label(config),
        model = %config.extractor.model,
        concurrency = config.orchestrator.effective_concurrency(),
        persist = config.orchestrator.persist,
        "Starting run"
    );

    let ticker = spawn_progress_ticker(orchestrator.progress());
    let report = pipeline(config).run(&input, &orchestrator, importer.as_mut()).await;
    ticker.abort();

    Ok(report?)
}

fn provider_label(config: &RunConfig) -> &'static str {
    match config.provider.kind {
        ProviderKind::Ollama => "ollama",
        ProviderKind::Gemini => "gemini",
    }
}

fn input_dir(config: &RunConfig) -> Result<PathBuf> {
    config
        .input_dir
        .clone()
        .ok_or_else(|| CliError::InvalidInput("an input directory is required (--input)".into()))
}

fn pipeline(config: &RunConfig) -> Pipeline<PlainTextSource> {
    Pipeline::new(
        DocumentLoader::new(PlainTextSource::new()),
        TextCleaner::new(config.cleaner.clone()),
        Some(ArtifactStore::new(&config.output_dir)),
    )
}

fn open_importer(config: &RunConfig) -> Result<BatchImporter> {
    let store = SqliteStore::new(&config.store.path)?;
    Ok(BatchImporter::new(
        store,
        ImportOptions {
            replace: config.orchestrator.replace,
        },
    ))
}

/// Log a progress line every few seconds until aborted.
fn spawn_progress_ticker(progress: Arc<BatchProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let snapshot = progress.snapshot();
            if snapshot.total > 0 {
                info!(
                    processed = snapshot.processed,
                    total = snapshot.total,
                    failed = snapshot.failed,
                    "Progress"
                );
            }
        }
    })
}
