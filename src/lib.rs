//! Client library for on-chain price prediction markets.
//!
//! Each market asks whether an asset pair will trade HIGHER or LOWER than a
//! target price at a resolution time. Bettors stake an ERC-20 token into the
//! HIGHER or LOWER pool; winners split the whole pool pro rata.
//!
//! ```text
//! HIGHER pool:  700 NOS
//! LOWER pool:   300 NOS
//! ─────────────────────
//! Implied odds: 70.0% / 30.0%
//! 100 on LOWER pays ~250 if LOWER wins
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Contract gateway, market store, aggregation and transaction flows
//! - [`feeds`]: Price feed directory, filtering and caching
//! - [`estimate`]: Odds and potential payout estimates
//! - [`countdown`]: Time-left formatting
//! - [`format`]: Display formatters
//! - [`units`]: Token unit conversion and amount parsing
//! - [`signing`]: Signers and the per-client signer cache
//! - [`context`]: Persisted theme and funded wallets
//! - [`funding`]: Test-token auto-funding and faucet
//! - [`api`]: HTTP API for health, markets, stats and metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod context;
pub mod countdown;
pub mod error;
pub mod estimate;
pub mod feeds;
pub mod format;
pub mod funding;
pub mod market;
pub mod metrics;
pub mod signing;
pub mod units;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
