//! Feed list shaping: suitability filter, address overrides, dedupe and views.

use std::collections::HashMap;

use tracing::debug;

use super::types::{FeedDescriptor, Network};

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Pairs offered for quick selection, in display order.
pub const POPULAR_PAIRS: [&str; 15] = [
    "BTC/USD", "ETH/USD", "BNB/USD", "SOL/USD", "ADA/USD", "DOT/USD", "AVAX/USD", "MATIC/USD",
    "LINK/USD", "UNI/USD", "EUR/USD", "GBP/USD", "JPY/USD", "CHF/USD", "AUD/USD",
];

/// Known working Sepolia aggregator proxies.
pub const SEPOLIA_OVERRIDES: [(&str, &str); 3] = [
    ("BTC/USD", "0x1b44F3514812d835EB1BDB0acB33d3fA3351Ee43"),
    ("ETH/USD", "0x694AA1769357215DE4FAC081bf1f309aDC325306"),
    ("LINK/USD", "0xc59E3633BAAC79493d908e63626716e204A45EdF"),
];

/// Why a feed was rejected, `None` if it is suitable for a market.
pub fn rejection_reason(feed: &FeedDescriptor) -> Option<&'static str> {
    if matches!(feed.feed_category.as_str(), "deprecated" | "test") {
        return Some("category");
    }
    if feed.docs.hidden == Some(true) && !feed.feed_category.is_empty() {
        return Some("hidden");
    }
    if matches!(feed.feed_type.as_str(), "Deprecated" | "Test") {
        return Some("feed type");
    }
    match feed.contract_address.as_deref() {
        None | Some("") => return Some("missing contract address"),
        Some(address) if address.eq_ignore_ascii_case(ZERO_ADDRESS) => return Some("zero contract address"),
        Some(_) => {}
    }
    if feed.name.is_empty() && feed.pair.is_empty() {
        return Some("no name or pair");
    }
    None
}

/// Whether `feed` can back a market.
pub fn is_suitable(feed: &FeedDescriptor) -> bool {
    rejection_reason(feed).is_none()
}

/// Replace the addresses of feeds known to be misreported on `network`.
pub fn apply_override(mut feed: FeedDescriptor, network: Network) -> FeedDescriptor {
    if network != Network::Sepolia {
        return feed;
    }
    let Some(pair) = feed.pair_key() else {
        return feed;
    };
    if let Some((_, address)) = SEPOLIA_OVERRIDES.iter().find(|(key, _)| *key == pair) {
        debug!(pair = %pair, address, "Overriding feed address");
        feed.contract_address = Some(address.to_string());
        feed.proxy_address = Some(address.to_string());
    }
    feed
}

/// Drop feeds sharing a canonical address, keeping the first seen.
///
/// When a later duplicate carries a proxy address and the kept entry does
/// not, the later entry takes its place.
pub fn dedupe(feeds: Vec<FeedDescriptor>) -> Vec<FeedDescriptor> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<FeedDescriptor> = Vec::with_capacity(feeds.len());

    for feed in feeds {
        let Some(key) = feed.canonical_address().map(str::to_lowercase) else {
            continue;
        };
        match positions.get(&key) {
            Some(&index) => {
                if !has_proxy(&unique[index]) && has_proxy(&feed) {
                    unique[index] = feed;
                }
            }
            None => {
                positions.insert(key, unique.len());
                unique.push(feed);
            }
        }
    }

    unique
}

fn has_proxy(feed: &FeedDescriptor) -> bool {
    feed.proxy_address.as_deref().is_some_and(|a| !a.is_empty())
}

/// Filter, override and dedupe a raw directory listing.
pub fn prepare(network: Network, raw: Vec<FeedDescriptor>) -> Vec<FeedDescriptor> {
    let total = raw.len();
    let suitable: Vec<FeedDescriptor> = raw
        .into_iter()
        .filter(|feed| match rejection_reason(feed) {
            Some(reason) => {
                debug!(feed = %feed.name, reason, "Feed filtered out");
                false
            }
            None => true,
        })
        .map(|feed| apply_override(feed, network))
        .collect();
    let suitable_count = suitable.len();
    let unique = dedupe(suitable);

    debug!(
        network = %network,
        total,
        suitable = suitable_count,
        unique = unique.len(),
        "Feed list prepared"
    );
    unique
}

/// Feeds whose pair is in [`POPULAR_PAIRS`], in that order.
pub fn popular(feeds: &[FeedDescriptor]) -> Vec<FeedDescriptor> {
    let mut ranked: Vec<(usize, &FeedDescriptor)> = feeds
        .iter()
        .filter_map(|feed| {
            let pair = feed.pair_key()?;
            POPULAR_PAIRS.iter().position(|p| *p == pair).map(|rank| (rank, feed))
        })
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, feed)| feed.clone()).collect()
}

/// Feeds whose display name or asset name contains `query`, case-insensitively.
pub fn search<'a>(feeds: &'a [FeedDescriptor], query: &str) -> Vec<&'a FeedDescriptor> {
    let needle = query.trim().to_lowercase();
    feeds
        .iter()
        .filter(|feed| {
            needle.is_empty()
                || feed.display_name().to_lowercase().contains(&needle)
                || feed.asset_name.to_lowercase().contains(&needle)
        })
        .collect()
}
