//! Serializable scan configuration.
//!
//! ```toml
//! [scan]
//! min_score = 60
//! max_results = 50
//! workers = 1
//!
//! [fetch]
//! lookback = "60d"
//! max_attempts = 2
//! attempt_timeout_secs = 10
//! retry_delay_ms = 500
//!
//! [pacing]
//! symbol_pause_ms = 100
//! batch_size = 10
//! batch_pause_ms = 500
//! ```
//!
//! Every field has a default, so an empty file is a valid config. An optional
//! `[scoring]` table overrides individual band tables of the scoring policy.

use serde::{Deserialize, Serialize};
use springscan_core::data::Lookback;
use springscan_core::scoring::{PolicyError, ScoringPolicy, MAX_SCORE};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Content hash of a config; identical configs share it.
pub type ConfigFingerprint = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("min_score must be at most 100, got {0}")]
    MinScoreOutOfRange(u32),

    #[error("max_results must be at least 1")]
    ZeroMaxResults,

    #[error("workers must be at least 1")]
    ZeroWorkers,

    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("scoring policy: {0}")]
    Policy(#[from] PolicyError),
}

/// Top-level scan configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    pub scan: ScanSettings,
    pub fetch: FetchPolicy,
    pub pacing: PacingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Lowest score that makes it into the results (0-100).
    pub min_score: u32,
    /// Results kept after ranking.
    pub max_results: usize,
    /// 1 = sequential with fixed pauses; more = thread pool behind a rate limiter.
    pub workers: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            min_score: 60,
            max_results: 50,
            workers: 1,
        }
    }
}

/// How a single symbol's history is fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    pub lookback: Lookback,
    pub max_attempts: u32,
    pub attempt_timeout_secs: u64,
    pub retry_delay_ms: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            lookback: Lookback::default(),
            max_attempts: 2,
            attempt_timeout_secs: 10,
            retry_delay_ms: 500,
        }
    }
}

impl FetchPolicy {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Courtesy pauses between symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub symbol_pause_ms: u64,
    /// Every `batch_size`-th symbol is followed by the longer batch pause.
    pub batch_size: usize,
    pub batch_pause_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            symbol_pause_ms: 100,
            batch_size: 10,
            batch_pause_ms: 500,
        }
    }
}

impl PacingConfig {
    /// No pauses at all. Meant for offline providers and tests.
    pub fn none() -> Self {
        Self {
            symbol_pause_ms: 0,
            batch_size: 1,
            batch_pause_ms: 0,
        }
    }

    pub fn symbol_pause(&self) -> Duration {
        Duration::from_millis(self.symbol_pause_ms)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

impl ScanConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.min_score > MAX_SCORE {
            return Err(ConfigError::MinScoreOutOfRange(self.scan.min_score));
        }
        if self.scan.max_results == 0 {
            return Err(ConfigError::ZeroMaxResults);
        }
        if self.scan.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.fetch.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.pacing.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if let Some(policy) = &self.scoring {
            policy.validate()?;
        }
        Ok(())
    }

    /// The policy to score with: the override if present, else the default.
    pub fn scoring_policy(&self) -> ScoringPolicy {
        self.scoring.clone().unwrap_or_default()
    }

    /// BLAKE3 over the JSON form.
    pub fn fingerprint(&self) -> Result<ConfigFingerprint, ConfigError> {
        let json =
            serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
