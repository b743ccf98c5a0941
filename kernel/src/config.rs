// Configuration
//
// TOML-backed settings for the publishing layer and process logging.
// Every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::publish::LogSinkConfig;

pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
pub const LOG_FORMATS: [&str; 2] = ["compact", "json"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub publishing: PublishingConfig,
    pub logging: LoggingConfig,
}

/// `[publishing]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishingConfig {
    pub output_dir: PathBuf,
    /// Seconds between background flushes.
    pub flush_interval: f64,
    /// Buffered records per topic that trigger an immediate flush.
    pub flush_limit: usize,
    pub write_buffer_size: usize,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            flush_interval: 1.0,
            flush_limit: 10_000,
            write_buffer_size: 8 * 1024,
        }
    }
}

impl PublishingConfig {
    /// Runtime settings for the file log sink. Call on a validated config.
    pub fn log_sink_config(&self) -> LogSinkConfig {
        LogSinkConfig {
            base_dir: self.output_dir.clone(),
            flush_interval: Duration::from_secs_f64(self.flush_interval),
            flush_limit: self.flush_limit,
            write_buffer_size: self.write_buffer_size,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "compact".into(),
        }
    }
}

impl Config {
    /// Load and validate a TOML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let publishing = &self.publishing;

        let interval = publishing.flush_interval;
        if interval <= 0.0 || Duration::try_from_secs_f64(interval).is_err() {
            return Err(ConfigError::Invalid(format!(
                "flush_interval must be a positive number of seconds, got {interval}"
            )));
        }

        if publishing.flush_limit == 0 {
            return Err(ConfigError::Invalid("flush_limit must be at least 1".into()));
        }

        if publishing.write_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "write_buffer_size must be at least 1".into(),
            ));
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                LOG_FORMATS.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());

        let sink = config.publishing.log_sink_config();
        assert_eq!(sink, LogSinkConfig::default());
    }

    #[test]
    fn parses_publishing_section() {
        let config = Config::from_toml(
            r#"
            [publishing]
            output_dir = "/var/lib/metalog"
            flush_interval = 5.0
            flush_limit = 10

            [logging]
            level = "DEBUG"
            "#,
        )
        .unwrap();

        let sink = config.publishing.log_sink_config();
        assert_eq!(sink.base_dir, PathBuf::from("/var/lib/metalog"));
        assert_eq!(sink.flush_interval, Duration::from_secs(5));
        assert_eq!(sink.flush_limit, 10);
        assert_eq!(sink.write_buffer_size, 8 * 1024);
        assert_eq!(config.logging.format, "compact");
    }

    #[test]
    fn fractional_interval() {
        let config = Config::from_toml("[publishing]\nflush_interval = 0.25\n").unwrap();
        assert_eq!(
            config.publishing.log_sink_config().flush_interval,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn rejects_bad_values() {
        for toml in [
            "[publishing]\nflush_interval = 0.0\n",
            "[publishing]\nflush_interval = -1.0\n",
            "[publishing]\nflush_interval = nan\n",
            "[publishing]\nflush_interval = inf\n",
            "[publishing]\nflush_limit = 0\n",
            "[publishing]\nwrite_buffer_size = 0\n",
            "[logging]\nlevel = \"loud\"\n",
            "[logging]\nformat = \"xml\"\n",
        ] {
            let err = Config::from_toml(toml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{toml}: {err}");
        }
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            Config::from_toml("[publishing\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
