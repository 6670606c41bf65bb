use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid ranking weight {name}: {value}. Must be finite and non-negative")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("Invalid suggestion limit: {0}. Must be at least 1")]
    InvalidLimit(usize),

    #[error("Invalid cache capacity: {0}. Must be at least 1")]
    InvalidCacheCapacity(usize),

    #[error("Invalid cache TTL: {0}s. Must be positive")]
    InvalidCacheTtl(u64),

    #[error("State path cannot be empty")]
    EmptyStatePath,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .proofsync/config.yaml (project config)
    /// 3. .proofsync/local.yaml (project local overrides, optional)
    /// 4. Environment variables (PROOFSYNC_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// The layered figment behind [`load`](Self::load).
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".proofsync/config.yaml"))
            .merge(Yaml::file(".proofsync/local.yaml"))
            .merge(Env::prefixed("PROOFSYNC_").split("__"))
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let weights = &config.ranking.weights;
        let named = [
            ("global", weights.global),
            ("category_match", weights.category_match),
            ("sample_confidence", weights.sample_confidence),
            ("recency", weights.recency),
            ("node_local", weights.node_local),
            ("goal_signature", weights.goal_signature),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        if config.ranking.limit == 0 {
            return Err(ConfigError::InvalidLimit(config.ranking.limit));
        }

        if config.ranking.cache_max_entries == 0 {
            return Err(ConfigError::InvalidCacheCapacity(config.ranking.cache_max_entries));
        }

        if config.ranking.cache_ttl_secs == 0 {
            return Err(ConfigError::InvalidCacheTtl(config.ranking.cache_ttl_secs));
        }

        if config.state.path.trim().is_empty() {
            return Err(ConfigError::EmptyStatePath);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.scheduler.diagnostics_ms, 400);
        assert_eq!(config.ranking.limit, 5);
        assert_eq!(config.state.path, ".proofsync/state.json");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
logging:
  level: debug
  format: json
scheduler:
  save_ms: 100
ranking:
  limit: 3
  weights:
    global: 0.6
state:
  path: /tmp/proofsync.json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.scheduler.save_ms, 100);
        assert_eq!(config.scheduler.activate_ms, 150);
        assert_eq!(config.ranking.limit, 3);
        assert!((config.ranking.weights.global - 0.6).abs() < f64::EPSILON);
        assert!((config.ranking.weights.recency - 0.10).abs() < f64::EPSILON);
        assert_eq!(config.state.path, "/tmp/proofsync.json");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_negative_weight() {
        let mut config = Config::default();
        config.ranking.weights.recency = -0.1;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidWeight { name: "recency", .. }
        ));
    }

    #[test]
    fn test_validate_ranking_bounds() {
        let mut config = Config::default();
        config.ranking.limit = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLimit(0)
        ));

        let mut config = Config::default();
        config.ranking.cache_max_entries = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidCacheCapacity(0)
        ));

        let mut config = Config::default();
        config.ranking.cache_ttl_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidCacheTtl(0)
        ));
    }

    #[test]
    fn test_validate_empty_state_path() {
        let mut config = Config::default();
        config.state.path = "  ".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyStatePath
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "ranking:\n  limit: 8\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "ranking:\n  limit: 2\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.ranking.limit, 2, "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }

    #[test]
    fn test_load_from_file_validates() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ranking:\n  limit: 0").unwrap();
        file.flush().unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_override() {
        use std::env;

        env::set_var("PROOFSYNC_SCHEDULER__SAVE_MS", "75");
        env::set_var("PROOFSYNC_LOGGING__LEVEL", "warn");

        let config: Config = ConfigLoader::figment().extract().unwrap();

        env::remove_var("PROOFSYNC_SCHEDULER__SAVE_MS");
        env::remove_var("PROOFSYNC_LOGGING__LEVEL");

        assert_eq!(config.scheduler.save_ms, 75);
        assert_eq!(config.logging.level, "warn");
    }
}
