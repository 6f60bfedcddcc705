//! Prediction markets: contract bindings, gateway, store and derived views.
//!
//! This module handles:
//! - Market types and data structures
//! - Contract gateway traits and the JSON-RPC implementation
//! - The refresh-guarded market list store
//! - Per-user bet and payout aggregation
//! - Transaction flows (bet with approval, create, claim)
//! - Mock gateway for testing

pub mod actions;
pub mod aggregate;
pub mod contracts;
pub mod gateway;
pub mod mock;
pub mod stats;
pub mod store;
pub mod types;
pub mod view;

pub use gateway::{parse_address, AlloyGateway, MarketGateway, TokenGateway};
pub use mock::{MockCall, MockConfig, MockGateway, MockMarketBuilder};
pub use stats::{filter_markets, MarketFilter};
pub use store::{FetchState, MarketBoard, MarketStore, RefreshOutcome, StoreSettings};
pub use types::{
    Automation, BetReceipt, FaucetStatus, Market, MarketStatus, NewMarket, PayoutInfo, PriceReading, Side,
    UserBet, UserBets,
};
pub use view::{MarketView, StatsView};
