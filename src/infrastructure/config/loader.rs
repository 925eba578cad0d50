use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::infrastructure::config::app_config::AppConfig;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid max_concurrent_turns: {0}. Must be at least 1")]
    InvalidMaxConcurrentTurns(usize),

    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid sampling rate: {0}. Must be within [0.0, 1.0]")]
    InvalidSamplingRate(f64),

    #[error("default_turn_configuration is invalid: {0}")]
    InvalidTurnConfiguration(String),

    #[error("configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (`Serialized`)
    /// 2. `.turn-engine/config.yaml` (project config)
    /// 3. `.turn-engine/local.yaml` (project local overrides, optional)
    /// 4. Environment variables (`TURN_ENGINE_*` prefix, highest priority)
    pub fn load() -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(".turn-engine/config.yaml"))
            .merge(Yaml::file(".turn-engine/local.yaml"))
            .merge(Env::prefixed("TURN_ENGINE_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, skipping the project-local
    /// search path. Used by `turn-engine validate-config <path>`.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
        if config.http.max_concurrent_turns == 0 {
            return Err(ConfigError::InvalidMaxConcurrentTurns(
                config.http.max_concurrent_turns,
            ));
        }

        if config.http.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddress(config.http.bind_address.clone()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if !(0.0..=1.0).contains(&config.tracing.default_sampling_rate) {
            return Err(ConfigError::InvalidSamplingRate(config.tracing.default_sampling_rate));
        }

        let turn_config_errors = config.default_turn_configuration.validate_constraints();
        let turn_config_errors: Vec<&String> = turn_config_errors
            .iter()
            .filter(|e| !e.contains("participants must not be empty"))
            .collect();
        if !turn_config_errors.is_empty() {
            return Err(ConfigError::InvalidTurnConfiguration(
                turn_config_errors
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("; "),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        ConfigLoader::validate(&config).expect("default config should be valid");
    }

    #[test]
    fn yaml_parsing_overrides_defaults() {
        let yaml = r"
http:
  bind_address: 127.0.0.1:9090
  max_concurrent_turns: 5
tracing:
  default_sampling_rate: 0.5
logging:
  level: debug
  format: pretty
";
        let config: AppConfig = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(config.http.bind_address, "127.0.0.1:9090");
        assert_eq!(config.http.max_concurrent_turns, 5);
        assert!((config.tracing.default_sampling_rate - 0.5).abs() < f64::EPSILON);
        ConfigLoader::validate(&config).expect("parsed config should be valid");
    }

    #[test]
    fn rejects_zero_max_concurrent_turns() {
        let mut config = AppConfig::default();
        config.http.max_concurrent_turns = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConcurrentTurns(0))
        ));
    }

    #[test]
    fn rejects_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.http.bind_address = "not-an-address".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBindAddress(_))
        ));
    }

    #[test]
    fn rejects_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_sampling_rate() {
        let mut config = AppConfig::default();
        config.tracing.default_sampling_rate = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidSamplingRate(_))
        ));
    }

    #[test]
    fn hierarchical_merging_lets_override_file_win() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(base_file, "http:\n  max_concurrent_turns: 5\nlogging:\n  level: info").unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "http:\n  max_concurrent_turns: 15").unwrap();
        override_file.flush().unwrap();

        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.http.max_concurrent_turns, 15, "override should win");
        assert_eq!(config.logging.level, "info", "base value should persist when not overridden");
    }
}
