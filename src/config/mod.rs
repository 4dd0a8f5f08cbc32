//! Configuration management for wallarchive
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use wallarchive::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Archiving markets: {:?}", config.archive.locales);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `WALLARCHIVE__<section>__<key>`
//!
//! Examples:
//! - `WALLARCHIVE__ARCHIVE__DAYS=3`
//! - `WALLARCHIVE__ARCHIVE__LOCALES=en-US,zh-CN,ja-JP`
//! - `WALLARCHIVE__FETCH__TIMEOUT=15s`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/wallarchive.toml`.
//! This can be overridden using the `WALLARCHIVE_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{ArchiveConfig, Config, DailyConfig, FetchConfig, SiteConfig, PREFERRED_INDEX_LOCALES};
pub use validation::{ValidationError, MAX_DAYS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[archive]
locales = ["ROW"]
index_locales = ["ROW"]
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.archive.locales, vec!["ROW"]);
        assert_eq!(config.archive.index_locales, vec!["ROW"]);
    }

    #[test]
    fn test_validation_catches_unknown_index_locale() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[archive]
locales = ["ROW"]
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::UnknownIndexLocale(_))
        ));
    }

    #[test]
    fn test_full_config_example() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[fetch]
endpoint = "https://www.bing.com/HPImageArchive.aspx"
host = "https://www.bing.com"
timeout = "10s"

[archive]
data_dir = "bing"
locales = ["ROW", "en-US", "en-GB", "ja-JP", "zh-CN"]
days = 7
dedup_key = ["fullstartdate"]
index_locales = ["zh-CN", "en-US"]

[daily]
path = "data/wallpapers.json"
market = "zh-CN"
days = 1

[site]
markdown_dir = "bing"
html_dir = "content"
images_per_row = 3
links_per_row = 10
months_per_row = 6
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();

        assert_eq!(config.archive.locales.len(), 5);
        assert_eq!(config.daily.market, "zh-CN");
        assert_eq!(config.site.months_per_row, 6);
        assert!(config.site.markdown_template.is_none());
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[archive]"));
        assert!(rendered.contains("timeout = \"10s\""));

        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.archive.locales, config.archive.locales);
        assert_eq!(parsed.fetch.timeout, config.fetch.timeout);
    }
}
