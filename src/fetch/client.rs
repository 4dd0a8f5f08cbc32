//! HTTP client for the image archive endpoint

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

use super::{FetchError, ImageSource, Result};
use crate::config::FetchConfig;
use crate::record::{ApiImage, ApiResponse};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl From<&FetchConfig> for HttpConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout: config.timeout.as_duration(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Client for `HPImageArchive`-style endpoints
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    client: Client,
    endpoint: Url,
}

impl ArchiveClient {
    /// Create a new client. One request per call, no retries.
    pub fn new(config: HttpConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| FetchError::InvalidEndpoint(format!("{}: {}", config.endpoint, e)))?;

        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    /// Request URL for `days` images of `market`, newest first.
    /// An empty market leaves the region choice to the server.
    pub fn request_url(&self, market: &str, days: u32) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("format", "js")
                .append_pair("idx", "0")
                .append_pair("n", &days.to_string());
            if !market.is_empty() {
                query.append_pair("mkt", market);
            }
        }
        url
    }

    async fn get(&self, url: Url) -> Result<Bytes> {
        debug!(%url, "Requesting image archive");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Image archive returned an error status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::RequestFailed(format!("Failed to read body: {}", e))
            }
        })?;

        debug!(%url, size = bytes.len(), "Image archive response received");
        Ok(bytes)
    }
}

/// Parse an archive response body
pub fn parse_response(bytes: &[u8]) -> Result<Vec<ApiImage>> {
    let response: ApiResponse = serde_json::from_slice(bytes)?;
    Ok(response.images)
}

#[async_trait]
impl ImageSource for ArchiveClient {
    async fn fetch(&self, market: &str, days: u32) -> Result<Vec<ApiImage>> {
        let bytes = self.get(self.request_url(market, days)).await?;
        let images = parse_response(&bytes)?;
        debug!(market, count = images.len(), "Parsed image archive response");
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;

    fn create_test_client() -> ArchiveClient {
        ArchiveClient::new(HttpConfig::from(&FetchConfig::default())).unwrap()
    }

    #[test]
    fn test_http_config_from_fetch_config() {
        let config = HttpConfig::from(&FetchConfig::default());
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.endpoint, "https://www.bing.com/HPImageArchive.aspx");
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_request_url_with_market() {
        let client = create_test_client();
        let url = client.request_url("zh-CN", 8);
        assert_eq!(
            url.as_str(),
            "https://www.bing.com/HPImageArchive.aspx?format=js&idx=0&n=8&mkt=zh-CN"
        );
    }

    #[test]
    fn test_request_url_without_market() {
        let client = create_test_client();
        let url = client.request_url("", 1);
        assert_eq!(url.query(), Some("format=js&idx=0&n=1"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = HttpConfig {
            endpoint: "not a url".to_string(),
            timeout: Duration::from_secs(1),
            user_agent: "test".to_string(),
        };
        assert!(matches!(ArchiveClient::new(config), Err(FetchError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_parse_response() {
        let body = br#"{"images":[{"startdate":"20240102","fullstartdate":"202401020800","urlbase":"/th?id=OHR.B_ZH-CN2","hsh":null}],"tooltips":{}}"#;
        let images = parse_response(body).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].fullstartdate, "202401020800");
        assert_eq!(images[0].hsh, "");
    }

    #[test]
    fn test_parse_response_without_images() {
        assert!(parse_response(b"{}").unwrap().is_empty());
        assert!(matches!(parse_response(b"<html>"), Err(FetchError::Decode(_))));
    }
}
