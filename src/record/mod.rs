//! Canonical record shapes stored in the archive
//!
//! Two schemas share the same pipeline:
//!
//! - [`WallpaperRecord`]: one image for one market, persisted as a flat JSON
//!   array per locale and ordered by `fullstartdate`.
//! - [`DailyWallpaper`]: the simplified single-market schema, persisted as a
//!   JSON object keyed by `YYYY-MM-DD`.
//!
//! Both implement [`Record`], which is all the merge engine, the partitioner
//! and the store need to know about a record.

mod normalize;
mod period;

pub use normalize::{ApiImage, ApiResponse, HashStrategy, Normalizer, HASH_STRATEGIES};
pub use period::Period;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Persisted dataset layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// JSON array sorted newest first
    Flat,
    /// JSON object keyed by the record date, sorted newest first
    DateKeyed,
}

impl Schema {
    /// Indentation used when the dataset is written back to disk
    pub fn indent(&self) -> &'static [u8] {
        match self {
            Schema::Flat => b"    ",
            Schema::DateKeyed => b"  ",
        }
    }
}

/// Addressable record fields, named as they appear on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordField {
    #[serde(rename = "fullstartdate", alias = "fullStartDate")]
    FullStartDate,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "urlbase", alias = "urlBase")]
    UrlBase,
    #[serde(rename = "copyright")]
    Copyright,
    #[serde(rename = "copyrightKeyword")]
    CopyrightKeyword,
    #[serde(rename = "hsh", alias = "hash")]
    Hash,
    #[serde(rename = "description")]
    Description,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "image_url")]
    ImageUrl,
}

impl RecordField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::FullStartDate => "fullstartdate",
            RecordField::Date => "date",
            RecordField::Url => "url",
            RecordField::UrlBase => "urlbase",
            RecordField::Copyright => "copyright",
            RecordField::CopyrightKeyword => "copyrightKeyword",
            RecordField::Hash => "hsh",
            RecordField::Description => "description",
            RecordField::Title => "title",
            RecordField::ImageUrl => "image_url",
        }
    }
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image links and captions a page needs to show one record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteEntry {
    pub date: String,
    pub title: String,
    pub preview_url: String,
    pub full_url: String,
}

/// Behaviour shared by every persisted record type
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// On-disk layout of a dataset of this record type
    const SCHEMA: Schema;

    /// Field the dataset is ordered and partitioned by
    const TEMPORAL: RecordField;

    /// Value of `field`, or `None` when this record type has no such field
    fn field(&self, field: RecordField) -> Option<&str>;

    /// Projection used by the page renderers
    fn site_entry(&self) -> SiteEntry;

    /// Ordering value, empty when absent
    fn temporal(&self) -> &str {
        self.field(Self::TEMPORAL).unwrap_or("")
    }

    /// Calendar month the record belongs to
    fn period(&self) -> Option<Period> {
        Period::from_date_str(self.temporal())
    }
}

/// One day's wallpaper for one market
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WallpaperRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fullstartdate: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub urlbase: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub copyright: String,
    #[serde(rename = "copyrightKeyword", default, deserialize_with = "null_as_empty")]
    pub copyright_keyword: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub hsh: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Fields written by other tools, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WallpaperRecord {
    /// Full HD rendition of the image
    pub fn preview_url(&self) -> String {
        format!("{}_1920x1080.jpg", self.urlbase)
    }

    /// UHD rendition of the image
    pub fn uhd_url(&self) -> String {
        format!("{}_UHD.jpg", self.urlbase)
    }
}

impl Record for WallpaperRecord {
    const SCHEMA: Schema = Schema::Flat;
    const TEMPORAL: RecordField = RecordField::FullStartDate;

    fn field(&self, field: RecordField) -> Option<&str> {
        let value = match field {
            RecordField::FullStartDate => &self.fullstartdate,
            RecordField::Date => &self.date,
            RecordField::Url => &self.url,
            RecordField::UrlBase => &self.urlbase,
            RecordField::Copyright => &self.copyright,
            RecordField::CopyrightKeyword => &self.copyright_keyword,
            RecordField::Hash => &self.hsh,
            RecordField::Description => &self.description,
            RecordField::Title => &self.title,
            RecordField::ImageUrl => return None,
        };
        Some(value.as_str())
    }

    fn site_entry(&self) -> SiteEntry {
        let title = if self.title.is_empty() {
            self.copyright.clone()
        } else {
            self.title.clone()
        };
        SiteEntry {
            date: self.date.clone(),
            title,
            preview_url: self.preview_url(),
            full_url: self.uhd_url(),
        }
    }
}

/// Simplified single-market record, keyed by `YYYY-MM-DD`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyWallpaper {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub copyright: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for DailyWallpaper {
    const SCHEMA: Schema = Schema::DateKeyed;
    const TEMPORAL: RecordField = RecordField::Date;

    fn field(&self, field: RecordField) -> Option<&str> {
        let value = match field {
            RecordField::Date => &self.date,
            RecordField::Title => &self.title,
            RecordField::Copyright => &self.copyright,
            RecordField::ImageUrl => &self.image_url,
            _ => return None,
        };
        Some(value.as_str())
    }

    fn site_entry(&self) -> SiteEntry {
        SiteEntry {
            date: self.date.clone(),
            title: self.title.clone(),
            preview_url: self.image_url.clone(),
            full_url: self.image_url.clone(),
        }
    }
}

/// Older archives contain `null` where a string was expected
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
