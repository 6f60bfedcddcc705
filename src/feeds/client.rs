//! HTTP client for the feed reference-data directory.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::FeedError;
use crate::metrics;

use super::catalog;
use super::types::{FeedDescriptor, Network};

/// Default delay before the first retry; doubled on each further attempt.
const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

/// Feed directory client.
#[derive(Debug, Clone)]
pub struct FeedClient {
    /// HTTP client for directory requests.
    http: reqwest::Client,
    /// Directory base URL.
    base_url: String,
    /// Extra attempts after a failed fetch.
    retries: u32,
    /// Delay before the first retry.
    backoff: Duration,
}

impl FeedClient {
    /// Create a client from config.
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            base_url: config.feeds_base_url.trim_end_matches('/').to_string(),
            retries: config.feed_fetch_retries,
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Create a client for `base_url` with default HTTP settings.
    pub fn with_base_url(base_url: impl Into<String>, retries: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retries,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Override the retry backoff.
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Directory URL for `network`.
    pub fn feeds_url(&self, network: Network) -> String {
        format!("{}/{}", self.base_url, network.feeds_path())
    }

    /// Fetch the raw directory listing, retrying failed attempts.
    #[instrument(skip(self), fields(network = %network))]
    pub async fn fetch_raw(&self, network: Network) -> Result<Vec<FeedDescriptor>, FeedError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(network).await {
                Ok(feeds) => return Ok(feeds),
                Err(e) if attempt < self.retries => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "Feed fetch failed, retrying");
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch and prepare the feeds usable for markets on `network`.
    pub async fn fetch(&self, network: Network) -> Result<Vec<FeedDescriptor>, FeedError> {
        let raw = self.fetch_raw(network).await?;
        Ok(catalog::prepare(network, raw))
    }

    async fn fetch_once(&self, network: Network) -> Result<Vec<FeedDescriptor>, FeedError> {
        let url = self.feeds_url(network);
        let start = Instant::now();

        let response = self.http.get(&url).send().await?;
        metrics::record_feed_fetch_latency(start, &network.to_string());

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::FetchFailed {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let feeds: Vec<FeedDescriptor> =
            serde_json::from_str(&body).map_err(|e| FeedError::ParseError(e.to_string()))?;

        debug!(count = feeds.len(), "Fetched feed directory");
        Ok(feeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feeds_url_joins_without_double_slash() {
        let client = FeedClient::with_base_url("https://example.test/", 0);
        assert_eq!(
            client.feeds_url(Network::Sepolia),
            "https://example.test/feeds-ethereum-testnet-sepolia.json"
        );
        assert_eq!(
            client.feeds_url(Network::Ethereum),
            "https://example.test/feeds-mainnet.json"
        );
    }

    #[test]
    fn client_builds_from_config() {
        let client = FeedClient::new(&crate::config::test_config()).unwrap();
        assert!(client.feeds_url(Network::Sepolia).starts_with("https://reference-data-directory"));
    }
}
