use crate::dataset::DedupKey;
use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub daily: DailyConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

/// Upstream image archive endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Prefix for the relative `url`/`urlbase` values the API returns
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_timeout")]
    pub timeout: HumanDuration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            host: default_host(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_endpoint() -> String {
    "https://www.bing.com/HPImageArchive.aspx".to_string()
}

fn default_host() -> String {
    "https://www.bing.com".to_string()
}

fn default_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/125.0.0.0 Safari/537.36 Edg/125.0.0.0"
        .to_string()
}

/// Per-market archive (flat schema)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Markets to fetch, e.g. `en-US`, `zh-CN`, `ROW`
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,
    /// Days requested per run (the API serves at most 8)
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default)]
    pub dedup_key: DedupKey,
    /// Markets whose data feeds the month index, most preferred first.
    /// Empty means [`PREFERRED_INDEX_LOCALES`] then the remaining `locales`.
    #[serde(default)]
    pub index_locales: Vec<String>,
}

/// Index source preference when `index_locales` is not set
pub const PREFERRED_INDEX_LOCALES: &[&str] = &["zh-CN", "en-US"];

impl ArchiveConfig {
    /// Markets to try, in order, when picking the month index source
    pub fn index_order(&self) -> Vec<String> {
        if !self.index_locales.is_empty() {
            return self.index_locales.clone();
        }

        let mut order: Vec<String> = PREFERRED_INDEX_LOCALES
            .iter()
            .filter(|preferred| self.locales.iter().any(|locale| locale == *preferred))
            .map(|preferred| preferred.to_string())
            .collect();
        for locale in &self.locales {
            if !order.contains(locale) {
                order.push(locale.clone());
            }
        }
        order
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            locales: default_locales(),
            days: default_days(),
            dedup_key: DedupKey::default(),
            index_locales: Vec::new(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("bing")
}

fn default_locales() -> Vec<String> {
    vec!["en-US".to_string(), "zh-CN".to_string()]
}

fn default_days() -> u32 {
    7
}

/// Single-market date-keyed dataset
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DailyConfig {
    #[serde(default = "default_daily_path")]
    pub path: PathBuf,
    /// Market code; empty lets the API pick from the client region
    #[serde(default)]
    pub market: String,
    #[serde(default = "default_daily_days")]
    pub days: u32,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            path: default_daily_path(),
            market: String::new(),
            days: default_daily_days(),
        }
    }
}

fn default_daily_path() -> PathBuf {
    PathBuf::from("data/wallpapers.json")
}

fn default_daily_days() -> u32 {
    1
}

/// Static site output
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(default = "default_markdown_dir")]
    pub markdown_dir: PathBuf,
    #[serde(default = "default_html_dir")]
    pub html_dir: PathBuf,
    #[serde(default = "default_images_per_row")]
    pub images_per_row: usize,
    /// Month links per row in the markdown archive table
    #[serde(default = "default_links_per_row")]
    pub links_per_row: usize,
    /// Month links per row on the HTML index
    #[serde(default = "default_months_per_row")]
    pub months_per_row: usize,
    /// Custom markdown month template replacing the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown_template: Option<PathBuf>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            markdown_dir: default_markdown_dir(),
            html_dir: default_html_dir(),
            images_per_row: default_images_per_row(),
            links_per_row: default_links_per_row(),
            months_per_row: default_months_per_row(),
            markdown_template: None,
        }
    }
}

fn default_markdown_dir() -> PathBuf {
    PathBuf::from("bing")
}

fn default_html_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_images_per_row() -> usize {
    3
}

fn default_links_per_row() -> usize {
    10
}

fn default_months_per_row() -> usize {
    6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordField;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.fetch.timeout.as_duration(), Duration::from_secs(10));
        assert_eq!(config.archive.data_dir, PathBuf::from("bing"));
        assert_eq!(config.archive.days, 7);
        assert_eq!(config.archive.dedup_key.fields(), &[RecordField::FullStartDate]);
        assert_eq!(config.site.images_per_row, 3);
        assert_eq!(config.site.links_per_row, 10);
        assert_eq!(config.daily.path, PathBuf::from("data/wallpapers.json"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[archive]
locales = ["ROW"]
dedup_key = ["hsh", "copyrightKeyword"]
        "#,
        )
        .unwrap();

        assert_eq!(config.archive.locales, vec!["ROW"]);
        assert_eq!(config.archive.dedup_key.fields().len(), 2);
        assert_eq!(config.archive.days, 7);
        assert_eq!(config.fetch.host, "https://www.bing.com");
        assert_eq!(config.archive.index_order(), vec!["ROW"]);
    }

    #[test]
    fn test_index_order_prefers_known_markets() {
        let mut archive = ArchiveConfig {
            locales: vec!["ja-JP".to_string(), "en-US".to_string(), "zh-CN".to_string()],
            ..Default::default()
        };
        assert_eq!(archive.index_order(), vec!["zh-CN", "en-US", "ja-JP"]);

        archive.index_locales = vec!["ja-JP".to_string()];
        assert_eq!(archive.index_order(), vec!["ja-JP"]);
    }
}
