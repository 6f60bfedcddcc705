//! Per-network feed cache with a time-to-live.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::FeedError;
use crate::metrics;

use super::catalog;
use super::client::FeedClient;
use super::types::{FeedDescriptor, Network};

#[derive(Debug, Clone)]
struct CachedFeeds {
    feeds: Arc<Vec<FeedDescriptor>>,
    fetched_at: Instant,
}

/// Prepared feed lists keyed by network.
#[derive(Debug)]
pub struct FeedCache {
    client: FeedClient,
    ttl: Duration,
    entries: DashMap<Network, CachedFeeds>,
}

impl FeedCache {
    /// Create a cache over `client` keeping lists for `ttl`.
    pub fn new(client: FeedClient, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Fresh cached list, if any.
    fn fresh(&self, network: Network) -> Option<Arc<Vec<FeedDescriptor>>> {
        let entry = self.entries.get(&network)?;
        (entry.fetched_at.elapsed() < self.ttl).then(|| entry.feeds.clone())
    }

    /// Prepared feeds for `network`, fetched on a miss or after expiry.
    pub async fn get(&self, network: Network) -> Result<Arc<Vec<FeedDescriptor>>, FeedError> {
        if let Some(feeds) = self.fresh(network) {
            metrics::inc_feed_cache_hits();
            debug!(network = %network, count = feeds.len(), "Feed cache hit");
            return Ok(feeds);
        }

        metrics::inc_feed_cache_misses();
        let feeds = Arc::new(self.client.fetch(network).await?);
        self.entries.insert(
            network,
            CachedFeeds {
                feeds: feeds.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(feeds)
    }

    /// Like [`FeedCache::get`], but an empty list on failure.
    pub async fn get_or_empty(&self, network: Network) -> Arc<Vec<FeedDescriptor>> {
        match self.get(network).await {
            Ok(feeds) => feeds,
            Err(e) => {
                warn!(network = %network, error = %e, "Failed to load feeds");
                Arc::new(Vec::new())
            }
        }
    }

    /// Popular feeds for `network`.
    pub async fn popular(&self, network: Network) -> Result<Vec<FeedDescriptor>, FeedError> {
        Ok(catalog::popular(&self.get(network).await?))
    }

    /// Drop the cached list for `network`.
    pub fn invalidate(&self, network: Network) {
        self.entries.remove(&network);
    }

    /// Number of cached networks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
