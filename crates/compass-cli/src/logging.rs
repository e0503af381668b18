//! Log subscriber setup.
//!
//! Logs go to stderr so `--format json` output on stdout stays parseable.
//! `RUST_LOG` overrides the verbosity flag.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!(
        "warn,compass={lvl},compass_cli={lvl},compass_orchestrator={lvl},compass_extractor={lvl},\
compass_llm={lvl},compass_ingest={lvl},compass_store={lvl}",
        lvl = level
    )
}

/// Install the global subscriber; a second call is a no-op.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
