//! Application configuration loaded from environment variables.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::feeds::Network;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Chain ===
    /// JSON-RPC endpoint URL.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Network name used for feed lookups ("sepolia" or "ethereum").
    #[serde(default)]
    pub network: Network,

    /// Market factory contract address.
    pub market_factory_address: String,

    /// Betting token (NOS) contract address.
    pub token_address: String,

    /// Optional wallet private key (hex). Without it the client is read-only.
    #[serde(default)]
    pub private_key: Option<String>,

    /// Token decimals used when the token's own `decimals()` read fails.
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,

    // === Market list refresh ===
    /// Maximum number of markets read per refresh.
    #[serde(default = "default_fetch_limit")]
    pub market_fetch_limit: usize,

    /// Minimum milliseconds between two full market-list refreshes.
    #[serde(default = "default_refresh_min_interval")]
    pub refresh_min_interval_ms: u64,

    /// Per-market stagger (ms) applied to reads within one refresh.
    #[serde(default = "default_stagger")]
    pub market_stagger_ms: u64,

    /// Concurrent bet-record reads per market (1 = sequential).
    #[serde(default = "default_bet_concurrency")]
    pub bet_read_concurrency: usize,

    // === Price feeds ===
    /// Base URL of the feed reference-data directory.
    #[serde(default = "default_feeds_base_url")]
    pub feeds_base_url: String,

    /// Seconds a fetched feed list stays fresh.
    #[serde(default = "default_feed_ttl")]
    pub feed_cache_ttl_secs: u64,

    /// Extra attempts after a failed feed fetch.
    #[serde(default = "default_feed_retries")]
    pub feed_fetch_retries: u32,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,

    // === Local state ===
    /// Path of the persisted app context (theme, funded addresses).
    #[serde(default = "default_context_path")]
    pub context_path: String,

    /// Test tokens minted to a wallet the first time it is seen.
    #[serde(default = "default_auto_fund_amount")]
    pub auto_fund_amount: Decimal,

    // === Server Configuration ===
    /// HTTP server port for the JSON API.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Emit logs as JSON.
    #[serde(default)]
    pub log_json: bool,
}

fn default_rpc_url() -> String {
    "https://ethereum-sepolia-rpc.publicnode.com".to_string()
}

fn default_token_decimals() -> u8 {
    6
}

fn default_fetch_limit() -> usize {
    10
}

fn default_refresh_min_interval() -> u64 {
    2_000
}

fn default_stagger() -> u64 {
    50
}

fn default_bet_concurrency() -> usize {
    1
}

fn default_feeds_base_url() -> String {
    "https://reference-data-directory.vercel.app".to_string()
}

fn default_feed_ttl() -> u64 {
    30 * 60
}

fn default_feed_retries() -> u32 {
    2
}

fn default_http_timeout() -> u64 {
    10_000
}

fn default_context_path() -> String {
    ".nos-markets.json".to_string()
}

fn default_auto_fund_amount() -> Decimal {
    Decimal::new(10, 0) // 10 NOS
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.rpc_url.is_empty() {
            return Err("RPC_URL is required".to_string());
        }

        for (name, value) in [
            ("MARKET_FACTORY_ADDRESS", &self.market_factory_address),
            ("TOKEN_ADDRESS", &self.token_address),
        ] {
            if !is_hex_address(value) {
                return Err(format!("{} must be a 0x-prefixed 20-byte hex address", name));
            }
        }

        if let Some(key) = &self.private_key {
            if !key.starts_with("0x") {
                return Err("PRIVATE_KEY must start with 0x".to_string());
            }
        }

        if self.market_fetch_limit == 0 {
            return Err("MARKET_FETCH_LIMIT must be at least 1".to_string());
        }

        if self.bet_read_concurrency == 0 {
            return Err("BET_READ_CONCURRENCY must be at least 1".to_string());
        }

        if self.auto_fund_amount < Decimal::ZERO {
            return Err("AUTO_FUND_AMOUNT must not be negative".to_string());
        }

        Ok(())
    }

    /// Whether write operations are available.
    pub fn can_sign(&self) -> bool {
        self.private_key.is_some()
    }

    /// Minimum interval between market-list refreshes.
    pub fn refresh_min_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_min_interval_ms)
    }

    /// Stagger applied between per-market reads.
    pub fn market_stagger(&self) -> Duration {
        Duration::from_millis(self.market_stagger_ms)
    }

    /// Feed cache time-to-live.
    pub fn feed_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.feed_cache_ttl_secs)
    }

    /// HTTP request timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

fn is_hex_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        rpc_url: default_rpc_url(),
        network: Network::Sepolia,
        market_factory_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
        token_address: "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".to_string(),
        private_key: None,
        token_decimals: default_token_decimals(),
        market_fetch_limit: default_fetch_limit(),
        refresh_min_interval_ms: default_refresh_min_interval(),
        market_stagger_ms: default_stagger(),
        bet_read_concurrency: default_bet_concurrency(),
        feeds_base_url: default_feeds_base_url(),
        feed_cache_ttl_secs: default_feed_ttl(),
        feed_fetch_retries: default_feed_retries(),
        http_timeout_ms: default_http_timeout(),
        context_path: default_context_path(),
        auto_fund_amount: default_auto_fund_amount(),
        port: default_port(),
        rust_log: default_log_level(),
        log_json: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_fetch_limit(), 10);
        assert_eq!(default_refresh_min_interval(), 2_000);
        assert_eq!(default_feed_retries(), 2);
        assert_eq!(default_auto_fund_amount(), Decimal::new(10, 0));
    }

    #[test]
    fn validate_accepts_test_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_malformed_factory_address() {
        let config = Config {
            market_factory_address: "0x1234".to_string(),
            ..test_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_invalid_private_key_prefix() {
        let config = Config {
            private_key: Some("abc123".to_string()),
            ..test_config()
        };

        assert!(config.validate().is_err());
        assert!(config.can_sign());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let config = Config {
            bet_read_concurrency: 0,
            ..test_config()
        };

        assert!(config.validate().is_err());
    }
}
