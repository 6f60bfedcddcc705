//! Market list store with a guarded, debounced refresh.
//!
//! A refresh reads the factory, then the first `fetch_limit` markets with a
//! per-index stagger, and publishes the survivors to a shared [`MarketBoard`].
//! [`FetchState`] rejects a refresh while one is in flight and for
//! `min_interval` after the last one finished. [`MarketStore::detach`] bumps a
//! liveness generation so results of refreshes started earlier are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use futures::future::join_all;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::metrics;

use super::gateway::MarketGateway;
use super::types::Market;

/// Refresh guard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// No refresh has run yet.
    Idle,
    /// A refresh is in flight.
    Fetching,
    /// The last refresh finished; the next one may start at `until`.
    Debounced {
        /// Earliest start of the next refresh.
        until: Instant,
    },
}

/// Result of a [`MarketStore::refresh`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Markets were read and published.
    Updated(usize),
    /// Another refresh was already in flight.
    SkippedInFlight,
    /// The previous refresh finished too recently.
    SkippedDebounced {
        /// Time until a refresh is allowed again.
        remaining: Duration,
    },
    /// The store was detached while reading; results were dropped.
    Discarded,
    /// The factory could not be read; the board was left unchanged.
    Failed(String),
}

/// Refresh tuning.
#[derive(Debug, Clone, Copy)]
pub struct StoreSettings {
    /// Maximum markets read per refresh.
    pub fetch_limit: usize,
    /// Minimum time between the end of one refresh and the start of the next.
    pub min_interval: Duration,
    /// Delay multiplied by the market's index before reading it.
    pub stagger: Duration,
}

impl StoreSettings {
    /// Settings from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            fetch_limit: config.market_fetch_limit,
            min_interval: config.refresh_min_interval(),
            stagger: config.market_stagger(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            fetch_limit: 10,
            min_interval: Duration::from_millis(2_000),
            stagger: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Default)]
struct BoardState {
    markets: Vec<Market>,
    refreshed_at: Option<OffsetDateTime>,
}

/// Latest published market list, shared with readers such as the API.
#[derive(Debug, Clone, Default)]
pub struct MarketBoard {
    inner: Arc<RwLock<BoardState>>,
}

impl MarketBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published list.
    pub async fn publish(&self, markets: Vec<Market>) {
        let mut state = self.inner.write().await;
        state.markets = markets;
        state.refreshed_at = Some(OffsetDateTime::now_utc());
    }

    /// Copy of the published list.
    pub async fn snapshot(&self) -> Vec<Market> {
        self.inner.read().await.markets.clone()
    }

    /// One published market.
    pub async fn get(&self, address: Address) -> Option<Market> {
        self.inner
            .read()
            .await
            .markets
            .iter()
            .find(|m| m.address == address)
            .cloned()
    }

    /// Whether at least one refresh has been published.
    pub async fn is_ready(&self) -> bool {
        self.inner.read().await.refreshed_at.is_some()
    }

    /// When the list was last published.
    pub async fn refreshed_at(&self) -> Option<OffsetDateTime> {
        self.inner.read().await.refreshed_at
    }
}

/// Market list store.
pub struct MarketStore<G> {
    gateway: Arc<G>,
    settings: StoreSettings,
    state: Mutex<FetchState>,
    liveness: AtomicU64,
    board: MarketBoard,
}

impl<G: MarketGateway> MarketStore<G> {
    /// Create a store publishing to a fresh board.
    pub fn new(gateway: Arc<G>, settings: StoreSettings) -> Self {
        Self::with_board(gateway, settings, MarketBoard::new())
    }

    /// Create a store publishing to an existing board.
    pub fn with_board(gateway: Arc<G>, settings: StoreSettings, board: MarketBoard) -> Self {
        Self {
            gateway,
            settings,
            state: Mutex::new(FetchState::Idle),
            liveness: AtomicU64::new(0),
            board,
        }
    }

    /// The board this store publishes to.
    pub fn board(&self) -> &MarketBoard {
        &self.board
    }

    /// Current guard state.
    pub async fn fetch_state(&self) -> FetchState {
        *self.state.lock().await
    }

    /// Drop the results of any refresh currently in flight.
    pub fn detach(&self) {
        let generation = self.liveness.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Market store detached");
    }

    /// Re-read the market list unless a refresh is in flight or debounced.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> RefreshOutcome {
        let generation = self.liveness.load(Ordering::SeqCst);

        {
            let mut state = self.state.lock().await;
            match *state {
                FetchState::Fetching => {
                    debug!("Already fetching, skipping refresh");
                    metrics::inc_refresh_skipped("in_flight");
                    return RefreshOutcome::SkippedInFlight;
                }
                FetchState::Debounced { until } => {
                    let now = Instant::now();
                    if now < until {
                        let remaining = until - now;
                        debug!(remaining_ms = remaining.as_millis() as u64, "Refresh debounced");
                        metrics::inc_refresh_skipped("debounced");
                        return RefreshOutcome::SkippedDebounced { remaining };
                    }
                }
                FetchState::Idle => {}
            }
            *state = FetchState::Fetching;
        }

        let _timer = metrics::timer_refresh();
        let result = self.load_markets().await;

        *self.state.lock().await = FetchState::Debounced {
            until: Instant::now() + self.settings.min_interval,
        };

        if self.liveness.load(Ordering::SeqCst) != generation {
            debug!(generation, "Store detached during refresh, discarding results");
            return RefreshOutcome::Discarded;
        }

        match result {
            Ok(markets) => {
                let count = markets.len();
                self.board.publish(markets).await;
                metrics::set_markets_listed(count);
                info!(count, "Markets refreshed");
                RefreshOutcome::Updated(count)
            }
            Err(reason) => {
                warn!(error = %reason, "Market refresh failed");
                RefreshOutcome::Failed(reason)
            }
        }
    }

    async fn load_markets(&self) -> Result<Vec<Market>, String> {
        let count = self.gateway.markets_count().await.map_err(|e| e.to_string())?;
        if count == 0 {
            debug!("No markets found");
            return Ok(Vec::new());
        }

        let addresses = self.gateway.all_markets().await.map_err(|e| e.to_string())?;
        let limited = addresses.into_iter().take(self.settings.fetch_limit);

        let reads = limited.enumerate().map(|(index, address)| async move {
            if index > 0 {
                sleep(self.settings.stagger * index as u32).await;
            }
            match self.gateway.market(address).await {
                Ok(market) => Some(market),
                Err(e) => {
                    warn!(market = %address, error = %e, "Dropping unreadable market");
                    None
                }
            }
        });

        Ok(join_all(reads).await.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::mock::{MockConfig, MockGateway, MockMarketBuilder};
    use pretty_assertions::assert_eq;

    fn gateway_with(count: u8, config: MockConfig) -> Arc<MockGateway> {
        let gateway = MockGateway::with_config(config);
        for i in 1..=count {
            gateway.add_market(MockMarketBuilder::new(Address::repeat_byte(i)).build());
        }
        Arc::new(gateway)
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_publishes_markets() {
        let store = MarketStore::new(gateway_with(3, MockConfig::default()), StoreSettings::default());
        assert!(!store.board().is_ready().await);

        assert_eq!(store.refresh().await, RefreshOutcome::Updated(3));
        assert!(store.board().is_ready().await);
        assert_eq!(store.board().snapshot().await.len(), 3);
        assert!(store.board().get(Address::repeat_byte(2)).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_is_limited_and_drops_failed_markets() {
        let gateway = gateway_with(12, MockConfig::default());
        gateway.fail_market(Address::repeat_byte(4));
        let store = MarketStore::new(gateway, StoreSettings::default());

        assert_eq!(store.refresh().await, RefreshOutcome::Updated(9));
        let addresses: Vec<_> = store.board().snapshot().await.iter().map(|m| m.address).collect();
        assert_eq!(addresses[0], Address::repeat_byte(1));
        assert!(!addresses.contains(&Address::repeat_byte(4)));
        assert!(!addresses.contains(&Address::repeat_byte(11)));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_while_fetching_is_skipped() {
        let config = MockConfig {
            latency_ms: 100,
            ..Default::default()
        };
        let store = MarketStore::new(gateway_with(2, config), StoreSettings::default());

        let (first, second) = tokio::join!(store.refresh(), async {
            tokio::task::yield_now().await;
            store.refresh().await
        });

        assert_eq!(first, RefreshOutcome::Updated(2));
        assert_eq!(second, RefreshOutcome::SkippedInFlight);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_is_debounced_after_completion() {
        let store = MarketStore::new(gateway_with(1, MockConfig::default()), StoreSettings::default());

        assert_eq!(store.refresh().await, RefreshOutcome::Updated(1));
        assert!(matches!(
            store.refresh().await,
            RefreshOutcome::SkippedDebounced { .. }
        ));

        tokio::time::advance(Duration::from_millis(2_000)).await;
        assert_eq!(store.refresh().await, RefreshOutcome::Updated(1));
    }

    #[tokio::test(start_paused = true)]
    async fn detach_discards_in_flight_results() {
        let config = MockConfig {
            latency_ms: 100,
            ..Default::default()
        };
        let store = MarketStore::new(gateway_with(2, config), StoreSettings::default());

        let (outcome, _) = tokio::join!(store.refresh(), async {
            tokio::task::yield_now().await;
            store.detach();
        });

        assert_eq!(outcome, RefreshOutcome::Discarded);
        assert!(!store.board().is_ready().await);
    }

    #[tokio::test(start_paused = true)]
    async fn factory_failure_keeps_previous_board() {
        let config = MockConfig {
            fail_factory: true,
            ..Default::default()
        };
        let store = MarketStore::new(gateway_with(1, config), StoreSettings::default());

        assert!(matches!(store.refresh().await, RefreshOutcome::Failed(_)));
        assert!(!store.board().is_ready().await);
        assert!(matches!(store.fetch_state().await, FetchState::Debounced { .. }));
    }
}
