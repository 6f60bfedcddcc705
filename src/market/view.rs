//! Display-ready market views for the JSON API and CLI output.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::format;

use super::stats::{AutomationStats, GlobalStats};
use super::types::{Market, MarketStatus, PayoutInfo, UserBets};

/// One market as shown on a card.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketView {
    /// Market contract address.
    pub address: String,
    /// Question text.
    pub question: String,
    /// Asset symbol.
    pub asset_name: String,
    /// Quote symbol.
    pub base_asset: String,
    /// Target price, formatted.
    pub target_price: String,
    /// Resolution time (unix seconds).
    pub resolution_time: i64,
    /// Resolution time, formatted.
    pub resolution_date: String,
    /// "Active", "Pending" or "Resolved".
    pub status: String,
    /// Countdown text.
    pub time_left: String,
    /// Less than a minute remains.
    pub is_urgent: bool,
    /// HIGHER pool, formatted token amount.
    pub total_higher: String,
    /// LOWER pool, formatted token amount.
    pub total_lower: String,
    /// Combined pool, formatted token amount.
    pub total_pool: String,
    /// HIGHER pool share in percent.
    #[schema(value_type = String)]
    pub higher_pct: Decimal,
    /// LOWER pool share in percent.
    #[schema(value_type = String)]
    pub lower_pct: Decimal,
    /// Decimal odds for HIGHER.
    #[schema(value_type = String)]
    pub higher_odds: Decimal,
    /// Decimal odds for LOWER.
    #[schema(value_type = String)]
    pub lower_odds: Decimal,
    /// Winning side once resolved.
    pub outcome: Option<String>,
    /// Settlement price once resolved, formatted.
    pub final_price: Option<String>,
    /// Random bonus winner.
    pub random_winner: Option<String>,
    /// Random bonus pool, formatted token amount.
    pub bonus_amount: Option<String>,
    /// Resolves through automation.
    pub is_automated: bool,
    /// Upkeep registered.
    pub automation_registered: bool,
    /// Bonus winner drawn.
    pub vrf_fulfilled: bool,
}

impl MarketView {
    /// Build the view of `market` at `now` with the token's decimals.
    pub fn new(market: &Market, now: i64, decimals: u32) -> Self {
        let odds = market.odds(decimals);
        let left = market.time_left(now);
        let status = market.status(now);

        Self {
            address: market.address.to_string(),
            question: market.question(),
            asset_name: market.asset_name.clone(),
            base_asset: market.base_asset.clone(),
            target_price: format::format_price(market.target_price),
            resolution_time: market.resolution_time,
            resolution_date: format::format_date(market.resolution_time),
            status: status.to_string(),
            time_left: left.text,
            is_urgent: left.is_urgent,
            total_higher: format::format_amount(market.total_higher_bets, decimals),
            total_lower: format::format_amount(market.total_lower_bets, decimals),
            total_pool: format::format_amount(market.total_pool(), decimals),
            higher_pct: odds.higher_pct.round_dp(1),
            lower_pct: odds.lower_pct.round_dp(1),
            higher_odds: odds.higher_decimal.round_dp(2),
            lower_odds: odds.lower_decimal.round_dp(2),
            outcome: market
                .outcome
                .filter(|_| status == MarketStatus::Resolved)
                .map(|side| side.to_string().to_uppercase()),
            final_price: market.final_price.map(format::format_price),
            random_winner: market.random_winner.map(|a| a.to_string()),
            bonus_amount: market.bonus_amount.map(|b| format::format_amount(b, decimals)),
            is_automated: market.automation.is_automated,
            automation_registered: market.automation.registered,
            vrf_fulfilled: market.automation.vrf_fulfilled,
        }
    }
}

/// Dashboard headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    /// Markets open for bets.
    pub active_markets: usize,
    /// Ended markets with a non-empty pool.
    pub total_markets: usize,
    /// Combined pool of all markets, formatted token amount.
    pub total_pool: String,
    /// Resolved markets.
    pub resolved_markets: usize,
    /// Automation numbers.
    pub automation: AutomationView,
}

/// Automation numbers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutomationView {
    /// Markets resolved through automation.
    pub automated_markets: usize,
    /// Unresolved markets with a registered upkeep.
    pub active_automations: usize,
    /// Markets whose bonus winner was drawn.
    pub resolved_with_vrf: usize,
    /// Automated share, e.g. "100.0%".
    pub automation_rate: String,
}

impl StatsView {
    /// Combine both stat groups.
    pub fn new(global: &GlobalStats, automation: &AutomationStats, decimals: u32) -> Self {
        Self {
            active_markets: global.active_markets,
            total_markets: global.total_markets,
            total_pool: format::format_amount(global.total_pool, decimals),
            resolved_markets: global.resolved_markets,
            automation: AutomationView {
                automated_markets: automation.automated_markets,
                active_automations: automation.active_automations,
                resolved_with_vrf: automation.resolved_with_vrf,
                automation_rate: format::format_percentage(automation.automation_rate),
            },
        }
    }
}

/// A user's position in one market.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    /// Stake on HIGHER, formatted.
    pub higher_bet: String,
    /// Stake on LOWER, formatted.
    pub lower_bet: String,
    /// Every bet claimed.
    pub has_claimed: bool,
    /// Bet indices.
    pub bet_indices: Vec<u64>,
    /// Unclaimed winnings, formatted.
    pub winning_payout: String,
    /// Bonus, formatted.
    pub bonus_payout: String,
    /// Total claimable, formatted.
    pub total_payout: String,
    /// Something can be claimed.
    pub can_claim: bool,
}

impl PositionView {
    /// Combine bets and payout figures.
    pub fn new(bets: &UserBets, payout: &PayoutInfo, decimals: u32) -> Self {
        Self {
            higher_bet: format::format_amount(bets.higher_bet, decimals),
            lower_bet: format::format_amount(bets.lower_bet, decimals),
            has_claimed: bets.has_claimed,
            bet_indices: bets.bet_indices.clone(),
            winning_payout: format::format_amount(payout.winning_payout, decimals),
            bonus_payout: format::format_amount(payout.bonus_payout, decimals),
            total_payout: format::format_amount(payout.total_payout, decimals),
            can_claim: payout.can_claim,
        }
    }
}
