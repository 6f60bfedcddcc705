//! Feed directory types.

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Networks with a feed directory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Ethereum mainnet.
    #[strum(to_string = "ethereum", serialize = "mainnet")]
    Ethereum,
    /// Sepolia testnet.
    #[default]
    Sepolia,
}

impl Network {
    /// EIP-155 chain id.
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Sepolia => 11_155_111,
        }
    }

    /// Map a chain id; unknown or missing ids fall back to Sepolia.
    pub fn from_chain_id(chain_id: Option<u64>) -> Self {
        match chain_id {
            Some(1) => Network::Ethereum,
            _ => Network::Sepolia,
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Ethereum => "Ethereum Mainnet",
            Network::Sepolia => "Sepolia Testnet",
        }
    }

    /// Directory file for this network.
    pub fn feeds_path(&self) -> &'static str {
        match self {
            Network::Ethereum => "feeds-mainnet.json",
            Network::Sepolia => "feeds-ethereum-testnet-sepolia.json",
        }
    }
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Documentation block of a feed entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedDocs {
    /// Hidden from the public listing.
    #[serde(default)]
    pub hidden: Option<bool>,
    /// Asset class, e.g. "Crypto".
    #[serde(default, deserialize_with = "null_default")]
    pub asset_class: String,
    /// Base asset symbol.
    #[serde(default, deserialize_with = "null_default")]
    pub base_asset: String,
    /// Quote asset symbol.
    #[serde(default, deserialize_with = "null_default")]
    pub quote_asset: String,
    /// Market hours, e.g. "Crypto".
    #[serde(default, deserialize_with = "null_default")]
    pub market_hours: String,
}

/// One price-feed entry of the reference data directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedDescriptor {
    /// Feed name, e.g. "BTC / USD".
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    /// `[base, quote]`.
    #[serde(default, deserialize_with = "null_default")]
    pub pair: Vec<String>,
    /// Aggregator address.
    #[serde(default)]
    pub contract_address: Option<String>,
    /// Proxy address consumers should read.
    #[serde(default)]
    pub proxy_address: Option<String>,
    /// Seconds between forced updates.
    #[serde(default)]
    pub heartbeat: Option<u64>,
    /// Answer decimals.
    #[serde(default)]
    pub decimals: Option<u32>,
    /// Long asset name, e.g. "Bitcoin".
    #[serde(default, deserialize_with = "null_default")]
    pub asset_name: String,
    /// Feed category, e.g. "low", "medium", "deprecated".
    #[serde(default, deserialize_with = "null_default")]
    pub feed_category: String,
    /// Feed type, e.g. "Crypto", "Forex".
    #[serde(default, deserialize_with = "null_default")]
    pub feed_type: String,
    /// Directory path slug.
    #[serde(default)]
    pub path: Option<String>,
    /// Documentation block.
    #[serde(default, deserialize_with = "null_default")]
    pub docs: FeedDocs,
}

impl FeedDescriptor {
    /// Address a market should read: the proxy, else the aggregator.
    pub fn canonical_address(&self) -> Option<&str> {
        self.proxy_address
            .as_deref()
            .filter(|a| !a.is_empty())
            .or(self.contract_address.as_deref().filter(|a| !a.is_empty()))
    }

    /// `"{base}/{quote}"` when both are known.
    pub fn pair_key(&self) -> Option<String> {
        match self.pair.as_slice() {
            [base, quote, ..] if !base.is_empty() && !quote.is_empty() => Some(format!("{}/{}", base, quote)),
            _ => None,
        }
    }

    /// Display name: the pair when known, else the feed name.
    pub fn display_name(&self) -> String {
        self.pair_key().unwrap_or_else(|| self.name.clone())
    }

    /// `"{pair} price feed"`, with the update cadence when a heartbeat is known.
    pub fn describe(&self) -> String {
        let base = format!("{} price feed", self.display_name());
        match self.heartbeat {
            Some(heartbeat) if heartbeat > 0 => format!("{} (updates every {}h)", base, heartbeat / 3_600),
            _ => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn network_parses_names_and_chain_ids() {
        assert_eq!(Network::from_str("ethereum").unwrap(), Network::Ethereum);
        assert_eq!(Network::from_str("Sepolia").unwrap(), Network::Sepolia);
        assert_eq!(Network::from_str("mainnet").unwrap(), Network::Ethereum);
        assert!(Network::from_str("polygon").is_err());

        assert_eq!(Network::from_chain_id(Some(1)), Network::Ethereum);
        assert_eq!(Network::from_chain_id(Some(11_155_111)), Network::Sepolia);
        assert_eq!(Network::from_chain_id(Some(137)), Network::Sepolia);
        assert_eq!(Network::from_chain_id(None), Network::Sepolia);
        assert_eq!(Network::Ethereum.to_string(), "ethereum");
    }

    #[test]
    fn descriptor_tolerates_nulls_and_unknown_fields() {
        let json = r#"{
            "name": "BTC / USD",
            "pair": null,
            "contractAddress": "0xabc",
            "proxyAddress": null,
            "heartbeat": 3600,
            "docs": {"hidden": true, "baseAsset": null},
            "history": {"whatever": 1}
        }"#;
        let feed: FeedDescriptor = serde_json::from_str(json).unwrap();
        assert!(feed.pair.is_empty());
        assert_eq!(feed.canonical_address(), Some("0xabc"));
        assert_eq!(feed.docs.hidden, Some(true));
        assert_eq!(feed.display_name(), "BTC / USD");
    }

    #[test]
    fn describe_includes_heartbeat_hours() {
        let feed = FeedDescriptor {
            pair: vec!["ETH".to_string(), "USD".to_string()],
            heartbeat: Some(7_200),
            ..Default::default()
        };
        assert_eq!(feed.describe(), "ETH/USD price feed (updates every 2h)");

        let feed = FeedDescriptor {
            heartbeat: None,
            ..feed
        };
        assert_eq!(feed.describe(), "ETH/USD price feed");
    }
}
