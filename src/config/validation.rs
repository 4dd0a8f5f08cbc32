use super::models::Config;
use std::collections::HashSet;
use thiserror::Error;

/// The upstream archive never serves more than this many days per request
pub const MAX_DAYS: u32 = 8;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No locales configured (at least one market is required)")]
    NoLocalesConfigured,

    #[error("Locale '{0}' is listed more than once")]
    DuplicateLocale(String),

    #[error("Locale '{0}' is empty or contains path separators")]
    InvalidLocale(String),

    #[error("Index locale '{0}' is not one of the configured locales")]
    UnknownIndexLocale(String),

    #[error("{field} must be between 1 and {max}, got {value}", max = MAX_DAYS)]
    InvalidDays { field: String, value: u32 },

    #[error("Dedup key must name at least one field")]
    EmptyDedupKey,

    #[error("Invalid endpoint scheme in '{0}', expected 'http://' or 'https://'")]
    InvalidEndpointScheme(String),

    #[error("Fetch timeout must be positive")]
    ZeroTimeout,

    #[error("Layout value must be positive: {field} = 0")]
    ZeroPerRow { field: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_fetch(config)?;
    validate_locales(config)?;
    validate_days(config)?;
    validate_site(config)?;
    Ok(())
}

fn validate_fetch(config: &Config) -> Result<(), ValidationError> {
    for url in [&config.fetch.endpoint, &config.fetch.host] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ValidationError::InvalidEndpointScheme(url.clone()));
        }
    }

    if config.fetch.timeout.as_duration().is_zero() {
        return Err(ValidationError::ZeroTimeout);
    }

    Ok(())
}

/// Locales name files on disk, so they must be unique and path-safe
fn validate_locales(config: &Config) -> Result<(), ValidationError> {
    let archive = &config.archive;
    if archive.locales.is_empty() {
        return Err(ValidationError::NoLocalesConfigured);
    }

    let mut seen = HashSet::new();
    for locale in &archive.locales {
        if locale.trim().is_empty() || locale.contains(['/', '\\']) || locale.contains("..") {
            return Err(ValidationError::InvalidLocale(locale.clone()));
        }
        if !seen.insert(locale.as_str()) {
            return Err(ValidationError::DuplicateLocale(locale.clone()));
        }
    }

    for locale in &archive.index_locales {
        if !seen.contains(locale.as_str()) {
            return Err(ValidationError::UnknownIndexLocale(locale.clone()));
        }
    }

    if archive.dedup_key.is_empty() {
        return Err(ValidationError::EmptyDedupKey);
    }

    Ok(())
}

fn validate_days(config: &Config) -> Result<(), ValidationError> {
    for (field, value) in [("archive.days", config.archive.days), ("daily.days", config.daily.days)] {
        if value == 0 || value > MAX_DAYS {
            return Err(ValidationError::InvalidDays {
                field: field.to_string(),
                value,
            });
        }
    }
    Ok(())
}

fn validate_site(config: &Config) -> Result<(), ValidationError> {
    let site = &config.site;
    for (field, value) in [
        ("site.images_per_row", site.images_per_row),
        ("site.links_per_row", site.links_per_row),
        ("site.months_per_row", site.months_per_row),
    ] {
        if value == 0 {
            return Err(ValidationError::ZeroPerRow {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}
