//! Upstream image archive access
//!
//! [`ImageSource`] is the seam the pipeline depends on; [`ArchiveClient`]
//! implements it over HTTP with a single fixed timeout.

mod client;

pub use client::{parse_response, ArchiveClient, HttpConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::record::ApiImage;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Provider of raw image entries for one market
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch the `days` most recent entries for `market`, newest first
    async fn fetch(&self, market: &str, days: u32) -> Result<Vec<ApiImage>>;
}
