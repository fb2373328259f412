//! Pipeline Configuration Settings
//!
//! Configuration types for the pipeline service, loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::application::services::{DEFAULT_SEARCH_DEBOUNCE, PipelineSettings};

/// Fixture files backing the coin and market sources.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// JSON array of coins.
    pub coins_fixture: PathBuf,
    /// JSON global market response.
    pub market_fixture: PathBuf,
}

/// Timing and queue settings for the pipeline.
#[derive(Debug, Clone)]
pub struct TimingSettings {
    /// Quiet period before the search filter runs.
    pub search_debounce: Duration,
    /// How long a reload waits for a feed (zero = wait forever).
    pub reload_timeout: Duration,
    /// Periodic refresh interval (zero = disabled).
    pub refresh_interval: Duration,
    /// Capacity of the pipeline command queue.
    pub command_capacity: usize,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            reload_timeout: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(60),
            command_capacity: 64,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Health check and metrics HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source fixture paths.
    pub sources: SourceSettings,
    /// Pipeline timing.
    pub timing: TimingSettings,
    /// Server ports.
    pub server: ServerSettings,
}

impl PipelineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if required keys are missing or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sources = SourceSettings {
            coins_fixture: required_path(&lookup, "PORTFOLIO_COINS_FIXTURE")?,
            market_fixture: required_path(&lookup, "PORTFOLIO_MARKET_FIXTURE")?,
        };

        let defaults = TimingSettings::default();
        let timing = TimingSettings {
            search_debounce: parse_duration_millis(
                &lookup,
                "PORTFOLIO_SEARCH_DEBOUNCE_MS",
                defaults.search_debounce,
            ),
            reload_timeout: parse_duration_secs(
                &lookup,
                "PORTFOLIO_RELOAD_TIMEOUT_SECS",
                defaults.reload_timeout,
            ),
            refresh_interval: parse_duration_secs(
                &lookup,
                "PORTFOLIO_REFRESH_INTERVAL_SECS",
                defaults.refresh_interval,
            ),
            command_capacity: parse_usize(
                &lookup,
                "PORTFOLIO_COMMAND_CAPACITY",
                defaults.command_capacity,
            )
            .max(1),
        };

        let server = ServerSettings {
            health_port: parse_u16(
                &lookup,
                "PORTFOLIO_HEALTH_PORT",
                ServerSettings::default().health_port,
            ),
        };

        Ok(Self {
            sources,
            timing,
            server,
        })
    }

    /// Settings handed to the aggregation pipeline.
    #[must_use]
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            search_debounce: self.timing.search_debounce,
            reload_timeout: (!self.timing.reload_timeout.is_zero())
                .then_some(self.timing.reload_timeout),
            command_capacity: self.timing.command_capacity,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn required_path<F>(lookup: &F, key: &str) -> Result<PathBuf, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(PathBuf::from(value))
}

fn parse_u16<F>(lookup: &F, key: &str, default: u16) -> u16
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_usize<F>(lookup: &F, key: &str, default: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_duration_secs<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_duration_millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const FIXTURES: [(&str, &str); 2] = [
        ("PORTFOLIO_COINS_FIXTURE", "fixtures/coins.json"),
        ("PORTFOLIO_MARKET_FIXTURE", "fixtures/global.json"),
    ];

    #[test]
    fn defaults_apply_when_unset() {
        let config = PipelineConfig::from_lookup(lookup(&FIXTURES)).unwrap();
        assert_eq!(config.sources.coins_fixture, PathBuf::from("fixtures/coins.json"));
        assert_eq!(config.timing.search_debounce, Duration::from_millis(600));
        assert_eq!(config.timing.reload_timeout, Duration::from_secs(30));
        assert_eq!(config.timing.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.timing.command_capacity, 64);
        assert_eq!(config.server.health_port, 8083);
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = FIXTURES.to_vec();
        pairs.extend([
            ("PORTFOLIO_SEARCH_DEBOUNCE_MS", "250"),
            ("PORTFOLIO_RELOAD_TIMEOUT_SECS", "0"),
            ("PORTFOLIO_REFRESH_INTERVAL_SECS", "5"),
            ("PORTFOLIO_COMMAND_CAPACITY", "0"),
            ("PORTFOLIO_HEALTH_PORT", "9999"),
        ]);
        let config = PipelineConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.timing.search_debounce, Duration::from_millis(250));
        assert_eq!(config.timing.refresh_interval, Duration::from_secs(5));
        assert_eq!(config.timing.command_capacity, 1);
        assert_eq!(config.server.health_port, 9999);

        let settings = config.pipeline_settings();
        assert_eq!(settings.reload_timeout, None);
        assert_eq!(settings.search_debounce, Duration::from_millis(250));
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let mut pairs = FIXTURES.to_vec();
        pairs.push(("PORTFOLIO_HEALTH_PORT", "not-a-port"));
        let config = PipelineConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.server.health_port, 8083);
        assert_eq!(
            config.pipeline_settings().reload_timeout,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn missing_fixture_is_an_error() {
        let err = PipelineConfig::from_lookup(lookup(&FIXTURES[..1])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "PORTFOLIO_MARKET_FIXTURE"));
    }

    #[test]
    fn empty_fixture_is_an_error() {
        let pairs = [
            ("PORTFOLIO_COINS_FIXTURE", "  "),
            ("PORTFOLIO_MARKET_FIXTURE", "fixtures/global.json"),
        ];
        let err = PipelineConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "environment variable PORTFOLIO_COINS_FIXTURE cannot be empty"
        );
    }
}
