//! Recovery configuration.
//!
//! All strategy tuning lives here, loadable from a TOML file or built from
//! `Default`s. Validation happens at load — a registry built from a valid
//! `RecoveryConfig` never hits a configuration problem at evaluation time.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tuning for the retry strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// HTTP statuses and error classes worth retrying.
    pub retriable: Vec<String>,
    /// Maximum retry attempts per situation.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Exponential backoff factor.
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retriable: [
                "500",
                "502",
                "503",
                "504",
                "timeout",
                "connection_reset",
                "connection_refused",
            ]
            .map(String::from)
            .to_vec(),
            max_attempts: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Whether the given status/error class is worth retrying.
    pub fn is_retriable(&self, http_status: Option<u16>, error_type: Option<&str>) -> bool {
        let status_hit = http_status
            .map(|s| self.retriable.iter().any(|r| r == &s.to_string()))
            .unwrap_or(false);
        let type_hit = error_type
            .map(|t| self.retriable.iter().any(|r| r == t))
            .unwrap_or(false);
        status_hit || type_hit
    }
}

/// Tuning for the backtrack strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktrackConfig {
    /// Maximum backtrack attempts per situation.
    pub max_attempts: u32,
    /// How far back in the visit history to look.
    pub history_window: usize,
}

impl Default for BacktrackConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            history_window: 10,
        }
    }
}

/// Tuning for the model-assisted strategies' completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the completion service.
    pub base_url: String,
    /// Model name to use.
    pub model: String,
    /// Hard timeout on a completion call.
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            timeout_secs: 30,
        }
    }
}

/// Top-level recovery configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub retry: RetryConfig,
    pub backtrack: BacktrackConfig,
    pub model: ModelConfig,
}

impl RecoveryConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| ConfigError::Toml {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values a strategy could not work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Value {
                field: "retry.max_attempts".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.retry.backoff_multiplier <= 1.0 {
            return Err(ConfigError::Value {
                field: "retry.backoff_multiplier".into(),
                message: "must be greater than 1.0 so delays strictly increase".into(),
            });
        }
        if self.retry.initial_delay_ms == 0 {
            return Err(ConfigError::Value {
                field: "retry.initial_delay_ms".into(),
                message: "must be positive".into(),
            });
        }
        if self.backtrack.max_attempts == 0 {
            return Err(ConfigError::Value {
                field: "backtrack.max_attempts".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::Value {
                field: "model.timeout_secs".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }
}
