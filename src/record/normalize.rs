//! Conversion of upstream image entries into archive records

use serde::Deserialize;
use tracing::{debug, warn};

use super::{DailyWallpaper, WallpaperRecord, null_as_empty};

/// Body of an image archive response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub images: Vec<ApiImage>,
}

/// One entry of the upstream `images` array, every field optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiImage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub startdate: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fullstartdate: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub urlbase: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub copyright: String,
    #[serde(default, alias = "copyrightLink", deserialize_with = "null_as_empty")]
    pub copyrightlink: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub hsh: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub desc: String,
}

/// Ways of recovering an image fingerprint, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashStrategy {
    /// The fingerprint published by the API
    ApiField,
    /// Trailing `_` segment of `urlbase`
    UrlBaseSuffix,
}

/// Fingerprint strategies in evaluation order
pub const HASH_STRATEGIES: &[HashStrategy] = &[HashStrategy::ApiField, HashStrategy::UrlBaseSuffix];

impl HashStrategy {
    pub fn rationale(&self) -> &'static str {
        match self {
            HashStrategy::ApiField => "upstream fingerprint is authoritative when published",
            HashStrategy::UrlBaseSuffix => "older responses omit hsh; the urlbase tail is stable per image",
        }
    }

    fn apply(&self, image: &ApiImage) -> Option<String> {
        let value = match self {
            HashStrategy::ApiField => image.hsh.as_str(),
            HashStrategy::UrlBaseSuffix => trailing_segment(&image.urlbase, '_'),
        };
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// Market-scoped normalizer. Pure: no I/O and no shared state.
#[derive(Debug, Clone)]
pub struct Normalizer {
    host: String,
    market: String,
}

impl Normalizer {
    pub fn new(host: impl Into<String>, market: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            market: market.into(),
        }
    }

    /// Markets whose feed carries a localized `desc`
    pub fn is_chinese_market(&self) -> bool {
        self.market.to_ascii_lowercase().starts_with("zh")
    }

    pub fn normalize(&self, image: &ApiImage) -> WallpaperRecord {
        let description = if self.is_chinese_market() {
            image.desc.clone()
        } else {
            image.copyright.clone()
        };

        WallpaperRecord {
            fullstartdate: image.fullstartdate.clone(),
            date: image.startdate.clone(),
            url: self.absolute(&image.url),
            urlbase: self.absolute(&image.urlbase),
            copyright: image.copyright.clone(),
            copyright_keyword: trailing_segment(&image.copyrightlink, '=').to_string(),
            hsh: resolve_hash(image),
            description,
            title: image.title.clone(),
            extra: Default::default(),
        }
    }

    pub fn normalize_all(&self, images: &[ApiImage]) -> Vec<WallpaperRecord> {
        images.iter().map(|image| self.normalize(image)).collect()
    }

    /// Build the date-keyed record; entries without an 8-digit `startdate`
    /// cannot be keyed and are skipped.
    pub fn normalize_daily(&self, image: &ApiImage) -> Option<DailyWallpaper> {
        let Some(date) = iso_date(&image.startdate) else {
            warn!(startdate = %image.startdate, market = %self.market, "Skipping image with malformed startdate");
            return None;
        };

        let image_url = if image.urlbase.is_empty() {
            String::new()
        } else {
            format!("{}_UHD.jpg", self.absolute(&image.urlbase))
        };

        Some(DailyWallpaper {
            date,
            title: image.title.clone(),
            copyright: image.copyright.clone(),
            image_url,
            extra: Default::default(),
        })
    }

    fn absolute(&self, path: &str) -> String {
        if path.is_empty() || path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.host, path)
        }
    }
}

fn resolve_hash(image: &ApiImage) -> String {
    for strategy in HASH_STRATEGIES {
        if let Some(hash) = strategy.apply(image) {
            debug!(?strategy, rationale = strategy.rationale(), "Resolved image fingerprint");
            return hash;
        }
    }
    String::new()
}

/// Text after the last `sep`; the whole value when `sep` is absent
fn trailing_segment(value: &str, sep: char) -> &str {
    value.rsplit(sep).next().unwrap_or("")
}

/// `YYYYMMDD` -> `YYYY-MM-DD`
fn iso_date(compact: &str) -> Option<String> {
    if compact.len() != 8 || !compact.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}-{}", &compact[..4], &compact[4..6], &compact[6..]))
}
