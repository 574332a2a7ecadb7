// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer tuning configuration.
//!
//! Process-wide defaults with optional overrides from a YAML file and the
//! command line. The YAML layer only carries knobs; connection settings
//! stay on the command line.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default batch size before a flush.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default flush interval in milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

/// Bounded exponential backoff for remote batch writes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt before giving up.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied per retry.
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Randomize each delay to avoid thundering herds.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following failure number `attempt` (0-based).
    ///
    /// `initial_delay * backoff_multiplier^attempt`, capped at `max_delay`.
    /// With jitter enabled the delay is scaled into `[0.5, 1.0)` of itself.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let secs = (self.initial_delay.as_secs_f64() * exp).min(self.max_delay.as_secs_f64());
        let base = Duration::from_secs_f64(secs.max(0.0));

        if self.jitter {
            base.mul_f64(0.5 + fastrand::f64() * 0.5)
        } else {
            base
        }
    }
}

/// Tuning knobs loadable from YAML; everything optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuningConfig {
    pub batch_size: Option<usize>,
    pub flush_interval_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub max_delay_ms: Option<u64>,
    pub jitter: Option<bool>,
}

/// Configuration parsing errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TuningConfig {
    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: TuningConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Parse from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// The retry policy with this config's overrides applied.
    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_delay: self
                .initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_delay),
            backoff_multiplier: self
                .backoff_multiplier
                .unwrap_or(defaults.backoff_multiplier),
            max_delay: self
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
            jitter: self.jitter.unwrap_or(defaults.jitter),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.unwrap_or(DEFAULT_FLUSH_INTERVAL_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = "{}";

    const FULL_YAML: &str = r#"
batch_size: 500
flush_interval_ms: 2000
max_retries: 5
initial_delay_ms: 100
backoff_multiplier: 3.0
max_delay_ms: 10000
jitter: false
"#;

    #[test]
    fn test_config_parse_minimal_uses_defaults() {
        let config = TuningConfig::from_yaml(MINIMAL_YAML).expect("parse minimal yaml");

        assert_eq!(config.batch_size(), DEFAULT_BATCH_SIZE);
        assert_eq!(config.flush_interval(), Duration::from_millis(1000));

        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_config_parse_all_fields() {
        let config = TuningConfig::from_yaml(FULL_YAML).expect("parse full yaml");

        assert_eq!(config.batch_size(), 500);
        assert_eq!(config.flush_interval(), Duration::from_millis(2000));

        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(100));
        assert_eq!(policy.backoff_multiplier, 3.0);
        assert_eq!(policy.max_delay, Duration::from_secs(10));
        assert!(!policy.jitter);
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        assert!(TuningConfig::from_yaml("batch_sise: 10").is_err());
    }

    #[test]
    fn test_delay_grows_exponentially_without_jitter() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: false,
        };

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_caps_at_max_delay() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 10.0,
            max_delay: Duration::from_secs(5),
            jitter: false,
        };

        assert_eq!(policy.delay_for(6), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: true,
        };

        for attempt in 0..4 {
            let base = Duration::from_millis(100 * 2u64.pow(attempt));
            let jittered = policy.delay_for(attempt);
            assert!(jittered >= base.mul_f64(0.5));
            assert!(jittered <= base);
        }
    }
}
