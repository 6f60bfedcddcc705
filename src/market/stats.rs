//! Market list filtering and dashboard statistics.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::types::Market;

/// Market list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MarketFilter {
    /// Every market.
    #[default]
    All,
    /// Unresolved markets whose resolution time is still ahead.
    Active,
    /// Resolved markets.
    Resolved,
}

impl MarketFilter {
    /// Whether `market` passes this filter at `now`.
    pub fn matches(&self, market: &Market, now: i64) -> bool {
        match self {
            MarketFilter::All => true,
            MarketFilter::Active => market.is_active(now),
            MarketFilter::Resolved => market.is_resolved,
        }
    }
}

/// Markets passing `filter` whose question contains `search`, case-insensitively.
pub fn filter_markets<'a>(
    markets: &'a [Market],
    filter: MarketFilter,
    search: &str,
    now: i64,
) -> Vec<&'a Market> {
    let needle = search.trim().to_lowercase();
    markets
        .iter()
        .filter(|m| needle.is_empty() || m.question().to_lowercase().contains(&needle))
        .filter(|m| filter.matches(m, now))
        .collect()
}

/// Headline numbers over the market list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlobalStats {
    /// Markets open for bets.
    pub active_markets: usize,
    /// Ended markets that attracted at least one bet.
    pub total_markets: usize,
    /// Sum of both pools across all markets, in token units.
    pub total_pool: U256,
    /// Resolved markets.
    pub resolved_markets: usize,
}

/// Automation and randomness numbers over the market list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AutomationStats {
    /// Markets in the list.
    pub total_markets: usize,
    /// Markets resolved through automation.
    pub automated_markets: usize,
    /// Unresolved markets with a registered upkeep.
    pub active_automations: usize,
    /// Markets whose random bonus winner was drawn.
    pub resolved_with_vrf: usize,
    /// Automated share of all markets, in percent.
    pub automation_rate: Decimal,
}

/// Compute [`GlobalStats`] at `now`.
pub fn global_stats(markets: &[Market], now: i64) -> GlobalStats {
    GlobalStats {
        active_markets: markets.iter().filter(|m| m.is_active(now)).count(),
        total_markets: markets
            .iter()
            .filter(|m| !m.total_pool().is_zero() && m.has_ended(now))
            .count(),
        total_pool: markets
            .iter()
            .fold(U256::ZERO, |sum, m| sum.saturating_add(m.total_pool())),
        resolved_markets: markets.iter().filter(|m| m.is_resolved).count(),
    }
}

/// Compute [`AutomationStats`].
pub fn automation_stats(markets: &[Market]) -> AutomationStats {
    let total_markets = markets.len();
    let automated_markets = markets.iter().filter(|m| m.automation.is_automated).count();
    let automation_rate = if total_markets == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(automated_markets) * Decimal::ONE_HUNDRED / Decimal::from(total_markets))
            .round_dp(1)
    };

    AutomationStats {
        total_markets,
        automated_markets,
        active_automations: markets
            .iter()
            .filter(|m| m.automation.registered && !m.is_resolved)
            .count(),
        resolved_with_vrf: markets.iter().filter(|m| m.automation.vrf_fulfilled).count(),
        automation_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::mock::MockMarketBuilder;
    use crate::market::Side;
    use alloy::primitives::Address;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    const NOW: i64 = 1_700_000_000;

    fn sample() -> Vec<Market> {
        vec![
            MockMarketBuilder::new(Address::repeat_byte(1))
                .resolves_at(NOW + 3_600)
                .pools(5_000_000, 0)
                .automation(true, false)
                .build(),
            MockMarketBuilder::new(Address::repeat_byte(2))
                .pair("ETH", "USD")
                .resolves_at(NOW - 60)
                .pools(1_000_000, 2_000_000)
                .automation(true, false)
                .build(),
            MockMarketBuilder::new(Address::repeat_byte(3))
                .pair("ETH", "USD")
                .resolves_at(NOW - 7_200)
                .pools(0, 0)
                .resolved(Side::Lower, U256::from(1u64))
                .automation(true, true)
                .build(),
        ]
    }

    #[test]
    fn filter_parses_from_query_values() {
        assert_eq!(MarketFilter::from_str("active").unwrap(), MarketFilter::Active);
        assert_eq!(MarketFilter::from_str("resolved").unwrap(), MarketFilter::Resolved);
        assert!(MarketFilter::from_str("pending").is_err());
    }

    #[test]
    fn filter_and_search_combine() {
        let markets = sample();
        assert_eq!(filter_markets(&markets, MarketFilter::All, "", NOW).len(), 3);
        assert_eq!(filter_markets(&markets, MarketFilter::Active, "", NOW).len(), 1);
        assert_eq!(filter_markets(&markets, MarketFilter::Resolved, "", NOW).len(), 1);
        assert_eq!(filter_markets(&markets, MarketFilter::All, "eth/usd", NOW).len(), 2);
        assert!(filter_markets(&markets, MarketFilter::Active, "ETH", NOW).is_empty());
    }

    #[test]
    fn global_stats_count_only_ended_markets_with_bets_as_total() {
        let stats = global_stats(&sample(), NOW);
        assert_eq!(stats.active_markets, 1);
        assert_eq!(stats.total_markets, 1);
        assert_eq!(stats.total_pool, U256::from(8_000_000u64));
        assert_eq!(stats.resolved_markets, 1);
    }

    #[test]
    fn automation_stats_report_rate() {
        let stats = automation_stats(&sample());
        assert_eq!(stats.automated_markets, 3);
        assert_eq!(stats.active_automations, 2);
        assert_eq!(stats.resolved_with_vrf, 1);
        assert_eq!(stats.automation_rate, dec!(100));
        assert_eq!(automation_stats(&[]).automation_rate, Decimal::ZERO);
    }
}
