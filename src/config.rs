//! Configuration for batch coordination.
//!
//! This module provides the policy knobs for the coordinator's await loop
//! (poll cadence, stall threshold, hard batch timeout) and for request
//! building (eligibility floor, date bounds, line fallback, ladder mode),
//! plus layered settings loading from an optional TOML file and
//! `SLATECAST_`-prefixed environment variables.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::BatchResult;

/// Configuration for the coordinator's await-completion loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Interval between progress polls.
    /// Default: 500 milliseconds
    pub poll_interval: Duration,

    /// Time since the most recent worker event before the batch is
    /// considered stalled.
    /// Default: 120 seconds
    pub stall_threshold: Duration,

    /// Hard wall-clock budget for the whole batch, applied regardless of
    /// stall status.
    /// Default: 1800 seconds (30 minutes)
    pub batch_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            stall_threshold: Duration::from_secs(120),
            batch_timeout: Duration::from_secs(1800),
        }
    }
}

impl CoordinatorConfig {
    /// Creates a new CoordinatorConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config tuned for large slates: slower polling and more
    /// tolerance before declaring a stall.
    pub fn patient() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            stall_threshold: Duration::from_secs(300),
            batch_timeout: Duration::from_secs(3600),
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the stall threshold.
    pub fn with_stall_threshold(mut self, threshold: Duration) -> Self {
        self.stall_threshold = threshold;
        self
    }

    /// Sets the hard batch timeout.
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }
}

/// Configuration for request building.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBuilderConfig {
    /// Minimum projected minutes for a player to be included in the slate.
    /// Default: 12.0
    pub min_projected_minutes: f64,

    /// How far ahead of today a slate date may be. Dates in the past or
    /// beyond this bound yield an empty build.
    /// Default: 14 days
    pub max_lookahead_days: i64,

    /// Line used when a player has neither a published line nor scoring
    /// history.
    /// Default: 20.5
    pub default_line: f64,

    /// When true, each work item carries the five-line ladder around the
    /// resolved line instead of the single value.
    /// Default: false
    pub ladder: bool,
}

impl Default for RequestBuilderConfig {
    fn default() -> Self {
        Self {
            min_projected_minutes: 12.0,
            max_lookahead_days: 14,
            default_line: 20.5,
            ladder: false,
        }
    }
}

impl RequestBuilderConfig {
    /// Creates a new RequestBuilderConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum projected minutes threshold.
    pub fn with_min_projected_minutes(mut self, minutes: f64) -> Self {
        self.min_projected_minutes = minutes;
        self
    }

    /// Sets the maximum lookahead in days.
    pub fn with_max_lookahead_days(mut self, days: i64) -> Self {
        self.max_lookahead_days = days;
        self
    }

    /// Sets the default line fallback.
    pub fn with_default_line(mut self, line: f64) -> Self {
        self.default_line = line;
        self
    }

    /// Enables or disables ladder mode.
    pub fn with_ladder(mut self, ladder: bool) -> Self {
        self.ladder = ladder;
        self
    }
}

/// Coordinator section of the settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorSettings {
    pub poll_interval_ms: u64,
    pub stall_threshold_secs: u64,
    pub batch_timeout_secs: u64,
}

/// Request-builder section of the settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct BuilderSettings {
    pub min_projected_minutes: f64,
    pub max_lookahead_days: i64,
    pub default_line: f64,
    pub ladder: bool,
}

/// Layered settings: defaults, then an optional TOML file, then
/// `SLATECAST_`-prefixed environment variables (sections separated by `__`,
/// e.g. `SLATECAST_COORDINATOR__POLL_INTERVAL_MS`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub coordinator: CoordinatorSettings,
    pub builder: BuilderSettings,
}

impl Settings {
    /// Load settings, merging the given TOML file (or `slatecast.toml` in the
    /// working directory when `None`) over built-in defaults, then applying
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> BatchResult<Self> {
        let mut builder = config::Config::builder()
            .set_default("coordinator.poll_interval_ms", 500_i64)?
            .set_default("coordinator.stall_threshold_secs", 120_i64)?
            .set_default("coordinator.batch_timeout_secs", 1800_i64)?
            .set_default("builder.min_projected_minutes", 12.0_f64)?
            .set_default("builder.max_lookahead_days", 14_i64)?
            .set_default("builder.default_line", 20.5_f64)?
            .set_default("builder.ladder", false)?;

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("slatecast").required(false)),
        };

        builder = builder.add_source(config::Environment::with_prefix("SLATECAST").separator("__"));

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Materialize the coordinator config from these settings.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            poll_interval: Duration::from_millis(self.coordinator.poll_interval_ms),
            stall_threshold: Duration::from_secs(self.coordinator.stall_threshold_secs),
            batch_timeout: Duration::from_secs(self.coordinator.batch_timeout_secs),
        }
    }

    /// Materialize the request-builder config from these settings.
    pub fn builder_config(&self) -> RequestBuilderConfig {
        RequestBuilderConfig {
            min_projected_minutes: self.builder.min_projected_minutes,
            max_lookahead_days: self.builder.max_lookahead_days,
            default_line: self.builder.default_line,
            ladder: self.builder.ladder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_coordinator_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.stall_threshold, Duration::from_secs(120));
        assert_eq!(config.batch_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn test_patient_coordinator_config() {
        let config = CoordinatorConfig::patient();
        assert!(config.stall_threshold > CoordinatorConfig::default().stall_threshold);
        assert!(config.batch_timeout > CoordinatorConfig::default().batch_timeout);
    }

    #[test]
    fn test_coordinator_builder_pattern() {
        let config = CoordinatorConfig::new()
            .with_poll_interval(Duration::from_millis(50))
            .with_stall_threshold(Duration::from_secs(2))
            .with_batch_timeout(Duration::from_secs(10));

        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.stall_threshold, Duration::from_secs(2));
        assert_eq!(config.batch_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_default_builder_config() {
        let config = RequestBuilderConfig::default();
        assert_eq!(config.min_projected_minutes, 12.0);
        assert_eq!(config.max_lookahead_days, 14);
        assert_eq!(config.default_line, 20.5);
        assert!(!config.ladder);
    }

    #[test]
    fn test_builder_config_builder_pattern() {
        let config = RequestBuilderConfig::new()
            .with_min_projected_minutes(20.0)
            .with_max_lookahead_days(7)
            .with_default_line(15.5)
            .with_ladder(true);

        assert_eq!(config.min_projected_minutes, 20.0);
        assert_eq!(config.max_lookahead_days, 7);
        assert_eq!(config.default_line, 15.5);
        assert!(config.ladder);
    }

    #[test]
    fn test_settings_defaults_from_empty_file() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("slatecast.toml");
        fs::write(&path, "").expect("write");

        let settings = Settings::load(Some(&path)).expect("load");
        assert_eq!(settings.coordinator.poll_interval_ms, 500);
        assert_eq!(settings.coordinator.stall_threshold_secs, 120);
        assert_eq!(settings.builder.max_lookahead_days, 14);
        assert!(!settings.builder.ladder);
    }

    #[test]
    fn test_settings_file_overrides() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("slatecast.toml");
        fs::write(
            &path,
            r#"
[coordinator]
poll_interval_ms = 100
stall_threshold_secs = 30

[builder]
default_line = 18.5
ladder = true
"#,
        )
        .expect("write");

        let settings = Settings::load(Some(&path)).expect("load");
        assert_eq!(settings.coordinator.poll_interval_ms, 100);
        assert_eq!(settings.coordinator.stall_threshold_secs, 30);
        // Unset keys keep their defaults.
        assert_eq!(settings.coordinator.batch_timeout_secs, 1800);
        assert_eq!(settings.builder.default_line, 18.5);
        assert!(settings.builder.ladder);
    }

    #[test]
    fn test_settings_materialize_configs() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("slatecast.toml");
        fs::write(&path, "[coordinator]\npoll_interval_ms = 250\n").expect("write");

        let settings = Settings::load(Some(&path)).expect("load");
        let coordinator = settings.coordinator_config();
        let builder = settings.builder_config();

        assert_eq!(coordinator.poll_interval, Duration::from_millis(250));
        assert_eq!(builder.default_line, 20.5);
    }
}
