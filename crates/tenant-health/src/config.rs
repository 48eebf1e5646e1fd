//! Configuration for the health checker.
//!
//! Loaded once from `tenant-health.json` and passed into the evaluator
//! at construction time; nothing here is process-global or mutable after
//! startup. Every field has a default so a missing file still yields a
//! usable local-development configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::capacity::CapacityThresholds;
use crate::retry::RetryPolicy;
use crate::services::ServiceTarget;

/// Environment variable overriding the configured database URL.
const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Top-level configuration (tenant-health.json).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
    /// Service endpoints for the `services` subcommand.
    #[serde(default)]
    pub services: Vec<ServiceTarget>,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Database connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_database_url() -> String {
    "postgres://localhost:5432/platform".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Evaluation pass settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSettings {
    #[serde(default)]
    pub thresholds: CapacityThresholds,
    /// Trailing window for usage aggregation.
    #[serde(default = "default_window_days")]
    pub usage_window_days: u32,
    /// Per-probe timeout for the services subcommand.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            thresholds: CapacityThresholds::default(),
            usage_window_days: default_window_days(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

fn default_window_days() -> u32 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    10
}

/// Retry settings for external calls (database connect).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    5000
}

impl RetrySettings {
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

impl HealthConfig {
    /// Load configuration from a JSON file, falling back to defaults
    /// when the file does not exist, then apply environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {path}"))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {path}"))?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(ENV_DATABASE_URL) {
            if !url.is_empty() {
                config.database.url = url;
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::DEFAULT_WARN_RATIO;

    #[test]
    fn test_defaults() {
        let config = HealthConfig::default();
        assert_eq!(config.evaluation.usage_window_days, 30);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.services.is_empty());
        assert!(
            (config.evaluation.thresholds.users_warn_ratio - DEFAULT_WARN_RATIO).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn test_parse_partial_config() {
        let json = r#"{
            "database": { "url": "postgres://db.internal:5432/tenants" },
            "evaluation": {
                "thresholds": { "apiCallsWarnRatio": 0.9 },
                "usageWindowDays": 7
            },
            "services": [
                { "name": "api", "url": "https://api.internal/health" }
            ]
        }"#;
        let config: HealthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.database.url, "postgres://db.internal:5432/tenants");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.evaluation.usage_window_days, 7);
        assert!((config.evaluation.thresholds.api_calls_warn_ratio - 0.9).abs() < f64::EPSILON);
        assert!(
            (config.evaluation.thresholds.users_warn_ratio - DEFAULT_WARN_RATIO).abs()
                < f64::EPSILON
        );
        assert_eq!(config.services.len(), 1);
    }

    #[test]
    fn test_retry_settings_to_policy() {
        let settings = RetrySettings {
            max_attempts: 4,
            initial_backoff_ms: 100,
            max_backoff_ms: 300,
        };
        let policy = settings.policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(300));
    }
}
