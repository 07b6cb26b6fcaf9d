//! HTTP transport for the seismic feed
//!
//! Builds a `reqwest` client with a fixed per-request deadline and maps
//! transport failures onto the raw failure kinds used by classification.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use quake_core::{
    NoResponseKind, RawFailure, BACKOFF_BASE_MS, BACKOFF_CAP_MS, DEFAULT_FEED_URL,
    DEFAULT_MAX_RETRIES, DEFAULT_TTL_MS, REQUEST_TIMEOUT_SECS,
};

use crate::FeedTransport;

/// Feed fetch configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed endpoint URL
    pub endpoint: String,
    /// Cache key for this feed
    pub source_id: String,
    /// Per-request deadline in seconds
    pub timeout_secs: u64,
    /// Cache lifetime in milliseconds (zero or negative disables caching)
    pub ttl_ms: i64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// First backoff wait in milliseconds
    pub backoff_base_ms: u64,
    /// Longest single backoff wait in milliseconds
    pub backoff_cap_ms: u64,
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_FEED_URL.to_string(),
            source_id: DEFAULT_FEED_URL.to_string(),
            timeout_secs: REQUEST_TIMEOUT_SECS,
            ttl_ms: DEFAULT_TTL_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: BACKOFF_BASE_MS,
            backoff_cap_ms: BACKOFF_CAP_MS,
            user_agent: concat!("quakescope/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FeedConfig {
    /// Point at another endpoint; the cache key follows the URL
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self.source_id = endpoint.to_string();
        self
    }

    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Wait before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self
            .backoff_base_ms
            .saturating_mul(factor)
            .min(self.backoff_cap_ms);
        Duration::from_millis(ms)
    }
}

/// Create the HTTP client used by [`HttpTransport`]
pub fn create_feed_client(config: &FeedConfig) -> Result<Client, RawFailure> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| RawFailure::Local(format!("failed to build HTTP client: {e}")))
}

/// Feed transport over HTTPS
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &FeedConfig) -> Result<Self, RawFailure> {
        Ok(Self {
            client: create_feed_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<String, RawFailure> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RawFailure::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        response.text().await.map_err(map_reqwest_error)
    }
}

/// Sort a `reqwest` failure into the raw failure kinds
fn map_reqwest_error(err: reqwest::Error) -> RawFailure {
    if err.is_timeout() {
        return RawFailure::timeout(err.to_string());
    }
    if let Some(status) = err.status() {
        return RawFailure::Status {
            status: status.as_u16(),
            message: err.to_string(),
        };
    }
    if err.is_connect() {
        return RawFailure::network(err.to_string());
    }
    if err.is_builder() {
        return RawFailure::Local(err.to_string());
    }
    RawFailure::NoResponse {
        kind: NoResponseKind::Unclassified,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FeedConfig::default();
        assert!(config.endpoint.contains("earthquake.usgs.gov"));
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.ttl_ms, 300_000);
    }

    #[test]
    fn test_backoff_schedule() {
        let config = FeedConfig::default();
        assert_eq!(config.backoff(0), Duration::from_millis(1000));
        assert_eq!(config.backoff(1), Duration::from_millis(2000));
        assert_eq!(config.backoff(2), Duration::from_millis(4000));
        assert_eq!(config.backoff(3), Duration::from_millis(5000));
        assert_eq!(config.backoff(64), Duration::from_millis(5000));
    }

    #[test]
    fn test_endpoint_sets_cache_key() {
        let config = FeedConfig::default().with_endpoint("https://example.test/feed.geojson");
        assert_eq!(config.source_id, "https://example.test/feed.geojson");
    }

    #[tokio::test]
    async fn test_invalid_url_is_local_failure() {
        let transport = HttpTransport::new(&FeedConfig::default()).unwrap();
        let err = transport
            .get("not a url", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RawFailure::Local(_)));
    }
}
