//! Configuration for the Extractor

use compass_llm::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Model identifier passed to the provider
    pub model: String,

    /// Sampling temperature; 0 keeps repeated runs reproducible
    pub temperature: f32,

    /// Maximum output size (tokens)
    pub max_output_tokens: u32,

    /// Ceiling on the estimated input size (tokens)
    pub max_input_tokens: usize,

    /// Characters per token used for the estimate
    pub chars_per_token: usize,

    /// Maximum time for a single provider call (seconds)
    pub request_timeout_secs: u64,

    /// Backoff applied around each provider call
    pub retry: RetryPolicy,
}

impl ExtractorConfig {
    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be within [0, 2]".to_string());
        }
        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be greater than 0".to_string());
        }
        if self.max_input_tokens == 0 {
            return Err("max_input_tokens must be greater than 0".to_string());
        }
        if self.chars_per_token == 0 {
            return Err("chars_per_token must be greater than 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }
        self.retry.validate()
    }
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            model: "llama3.1".to_string(),
            temperature: 0.0,
            max_output_tokens: 8_192,
            max_input_tokens: 100_000,
            chars_per_token: 4,
            request_timeout_secs: 120,
            retry: RetryPolicy::default(),
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: smaller budget, short timeout, few retries
    pub fn aggressive() -> Self {
        Self {
            max_input_tokens: 30_000,
            max_output_tokens: 4_096,
            request_timeout_secs: 60,
            retry: RetryPolicy {
                max_retries: 1,
                initial_delay_ms: 500,
                max_delay_ms: 10_000,
                jitter: true,
            },
            ..Self::default()
        }
    }

    /// Lenient preset: large budget, long timeout, patient retries
    pub fn lenient() -> Self {
        Self {
            max_input_tokens: 500_000,
            max_output_tokens: 16_384,
            request_timeout_secs: 300,
            retry: RetryPolicy {
                max_retries: 6,
                initial_delay_ms: 2_000,
                max_delay_ms: 120_000,
                jitter: true,
            },
            ..Self::default()
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
        assert!(ExtractorConfig::aggressive().validate().is_ok());
        assert!(ExtractorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_default_is_deterministic() {
        assert_eq!(ExtractorConfig::default().temperature, 0.0);
        assert_eq!(ExtractorConfig::default().chars_per_token, 4);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = ExtractorConfig::default();
        config.max_input_tokens = 0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.model = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.retry.max_delay_ms = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::lenient();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = ExtractorConfig::from_toml("model = \"gemini-2.0-flash\"\n").unwrap();
        assert_eq!(parsed.model, "gemini-2.0-flash");
        assert_eq!(parsed.max_input_tokens, ExtractorConfig::default().max_input_tokens);
    }
}
