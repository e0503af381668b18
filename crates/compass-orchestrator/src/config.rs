//! Configuration for batch orchestration
//!
//! Defines the concurrency ceiling, per-call pacing and which stages run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the batch orchestrator
///
/// # Examples
///
/// ```
/// use compass_orchestrator::OrchestratorConfig;
///
/// // Default configuration (balanced)
/// let config = OrchestratorConfig::default();
/// assert_eq!(config.concurrency, 4);
///
/// // Sequential runs ignore the ceiling and the pacing delay
/// let config = OrchestratorConfig { sequential: true, ..OrchestratorConfig::default() };
/// assert_eq!(config.effective_concurrency(), 1);
/// assert!(config.pacing_delay().is_zero());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum extraction calls in flight at once
    /// Default: 4
    pub concurrency: usize,

    /// Delay each worker waits before issuing its call (milliseconds)
    /// Default: 250
    pub pacing_delay_ms: u64,

    /// Write successful extractions to the store
    /// Default: true
    pub persist: bool,

    /// Process documents one at a time, in input order
    /// Default: false
    pub sequential: bool,

    /// Replace a file's previously persisted plan instead of skipping it
    /// Default: false
    pub replace: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            pacing_delay_ms: 250,
            persist: true,
            sequential: false,
            replace: false,
        }
    }
}

impl OrchestratorConfig {
    /// Aggressive preset: wide fan-out, short pacing
    ///
    /// Suited to local providers with no rate limiting.
    pub fn aggressive() -> Self {
        Self {
            concurrency: 16,
            pacing_delay_ms: 50,
            ..Self::default()
        }
    }

    /// Lenient preset: narrow fan-out, long pacing
    ///
    /// Suited to hosted providers with tight quotas.
    pub fn lenient() -> Self {
        Self {
            concurrency: 2,
            pacing_delay_ms: 1_000,
            ..Self::default()
        }
    }

    /// Ceiling actually applied; 1 in sequential mode
    pub fn effective_concurrency(&self) -> usize {
        if self.sequential {
            1
        } else {
            self.concurrency
        }
    }

    /// Pacing delay as a Duration; zero in sequential mode
    pub fn pacing_delay(&self) -> Duration {
        if self.sequential {
            Duration::ZERO
        } else {
            Duration::from_millis(self.pacing_delay_ms)
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        if self.pacing_delay_ms > 60_000 {
            return Err("pacing_delay_ms must not exceed 60000".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
