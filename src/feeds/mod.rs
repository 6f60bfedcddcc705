//! Price feeds offered when creating a market.
//!
//! Feeds come from the public reference-data directory, are filtered to those
//! suitable for a market, corrected with known Sepolia addresses, deduplicated
//! by address and cached per network.

pub mod cache;
pub mod catalog;
pub mod client;
pub mod types;

pub use cache::FeedCache;
pub use catalog::{popular, search, POPULAR_PAIRS};
pub use client::FeedClient;
pub use types::{FeedDescriptor, FeedDocs, Network};
