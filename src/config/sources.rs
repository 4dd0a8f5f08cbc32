use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "WALLARCHIVE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/wallarchive.toml";
const ENV_PREFIX: &str = "WALLARCHIVE";
const ENV_SEPARATOR: &str = "__";
const LIST_KEYS: &[&str] = &["archive.locales", "archive.index_locales", "archive.dedup_key"];

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // WALLARCHIVE__ARCHIVE__DAYS -> archive.days
    // WALLARCHIVE__ARCHIVE__LOCALES=en-US,zh-CN -> archive.locales
    let mut environment = Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .list_separator(",")
        .try_parsing(true);
    for key in LIST_KEYS {
        environment = environment.with_list_parse_key(key);
    }
    builder = builder.add_source(environment);

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.archive.days, 7);
        assert_eq!(config.fetch.endpoint, "https://www.bing.com/HPImageArchive.aspx");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[fetch]
timeout = "3s"

[archive]
data_dir = "archive"
locales = ["ROW", "ja-JP"]
days = 2
dedup_key = "hsh"
index_locales = ["ja-JP"]

[site]
images_per_row = 4
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.fetch.timeout.as_duration(), Duration::from_secs(3));
        assert_eq!(config.archive.data_dir, PathBuf::from("archive"));
        assert_eq!(config.archive.locales, vec!["ROW", "ja-JP"]);
        assert_eq!(config.archive.days, 2);
        assert_eq!(config.archive.dedup_key.fields().len(), 1);
        assert_eq!(config.site.images_per_row, 4);
        assert_eq!(config.site.links_per_row, 10);
    }

    // Environment overrides are not exercised here: mutating the process
    // environment is unsafe under edition 2024.
}
