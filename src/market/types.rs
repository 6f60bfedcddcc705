//! Market-related types for asset-price prediction markets.

use alloy::primitives::{Address, TxHash, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::countdown::{self, TimeLeft};
use crate::estimate::{self, Odds, Pools};
use crate::format;
use crate::units;

/// Side of a HIGHER/LOWER prediction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Price ends above the target (the contract's `isHigher = true`).
    #[strum(to_string = "higher", serialize = "HIGHER", serialize = "yes", serialize = "up")]
    #[default]
    Higher,
    /// Price ends at or below the target.
    #[strum(to_string = "lower", serialize = "LOWER", serialize = "no", serialize = "down")]
    Lower,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Higher => Side::Lower,
            Side::Lower => Side::Higher,
        }
    }

    /// Map the contract's `isHigher` flag.
    pub fn from_is_higher(is_higher: bool) -> Self {
        if is_higher {
            Side::Higher
        } else {
            Side::Lower
        }
    }

    /// The contract's `isHigher` flag.
    pub fn is_higher(&self) -> bool {
        matches!(self, Side::Higher)
    }
}

/// Automation and randomness flags reported by a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Automation {
    /// Market resolves through keeper automation (every factory market does).
    pub is_automated: bool,
    /// Upkeep registered with the automation network.
    pub registered: bool,
    /// A random bonus winner has been drawn.
    pub vrf_fulfilled: bool,
}

/// Lifecycle status as shown on a market card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum MarketStatus {
    /// Accepting bets.
    Active,
    /// Resolution time passed, outcome not yet known.
    Pending,
    /// Outcome known.
    Resolved,
}

/// Snapshot of one on-chain prediction market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    /// Market contract address.
    pub address: Address,
    /// Asset symbol (e.g. "BTC").
    pub asset_name: String,
    /// Quote symbol (e.g. "USD").
    pub base_asset: String,
    /// Target price in 8-decimal feed units.
    pub target_price: U256,
    /// Unix timestamp at which the market resolves.
    pub resolution_time: i64,
    /// Total token units staked on HIGHER.
    pub total_higher_bets: U256,
    /// Total token units staked on LOWER.
    pub total_lower_bets: U256,
    /// Whether the outcome has been settled.
    pub is_resolved: bool,
    /// Winning side, only set once resolved.
    pub outcome: Option<Side>,
    /// Settlement price in feed units, only set once resolved.
    pub final_price: Option<U256>,
    /// Random bonus winner, if drawn.
    pub random_winner: Option<Address>,
    /// Random bonus pool size in token units.
    pub bonus_amount: Option<U256>,
    /// Automation flags.
    pub automation: Automation,
}

impl Market {
    /// Pool totals as token-denominated decimals.
    pub fn pools(&self, decimals: u32) -> Pools {
        Pools::new(
            units::to_decimal_lossy(self.total_higher_bets, decimals),
            units::to_decimal_lossy(self.total_lower_bets, decimals),
        )
    }

    /// Combined pool in token units.
    pub fn total_pool(&self) -> U256 {
        self.total_higher_bets.saturating_add(self.total_lower_bets)
    }

    /// Implied odds for this snapshot.
    pub fn odds(&self, decimals: u32) -> Odds {
        estimate::odds(self.pools(decimals))
    }

    /// Check if the resolution time has passed.
    pub fn has_ended(&self, now: i64) -> bool {
        self.resolution_time <= now
    }

    /// Open for new bets.
    pub fn is_active(&self, now: i64) -> bool {
        !self.is_resolved && !self.has_ended(now)
    }

    /// Card status.
    pub fn status(&self, now: i64) -> MarketStatus {
        if self.is_resolved {
            MarketStatus::Resolved
        } else if self.has_ended(now) {
            MarketStatus::Pending
        } else {
            MarketStatus::Active
        }
    }

    /// Countdown to resolution.
    pub fn time_left(&self, now: i64) -> TimeLeft {
        countdown::time_left(self.resolution_time, now)
    }

    /// Human-readable market question.
    pub fn question(&self) -> String {
        format!(
            "Will {}/{} be HIGHER than {} by {}?",
            self.asset_name,
            self.base_asset,
            format::format_price(self.target_price),
            format::format_date(self.resolution_time)
        )
    }
}

/// One bet record of a user in a market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserBet {
    /// Global bet index used by `claimPayout`.
    pub bet_index: u64,
    /// Stake in token units.
    pub amount: U256,
    /// Side bet on.
    pub side: Side,
    /// Whether the payout was already claimed.
    pub claimed: bool,
    /// Payout owed in token units (zero for losing or unresolved bets).
    pub payout: U256,
}

/// All of a user's bets in one market, folded together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserBets {
    /// Summed stake on HIGHER.
    pub higher_bet: U256,
    /// Summed stake on LOWER.
    pub lower_bet: U256,
    /// True only if the user has bets and every one is claimed.
    pub has_claimed: bool,
    /// Bet indices for per-bet claims.
    pub bet_indices: Vec<u64>,
}

impl UserBets {
    /// Whether the user has any stake in the market.
    pub fn has_bets(&self) -> bool {
        !self.bet_indices.is_empty()
    }

    /// Stake on one side.
    pub fn stake(&self, side: Side) -> U256 {
        match side {
            Side::Higher => self.higher_bet,
            Side::Lower => self.lower_bet,
        }
    }
}

/// What a user can claim from a resolved market.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PayoutInfo {
    /// Unclaimed winnings across all bets.
    pub winning_payout: U256,
    /// Random bonus the user is eligible for.
    pub bonus_payout: U256,
    /// Winnings plus bonus.
    pub total_payout: U256,
    /// Any winnings are unclaimed.
    pub has_winnings: bool,
    /// Bonus can be claimed.
    pub has_bonus: bool,
    /// Something can be claimed.
    pub can_claim: bool,
}

/// Parameters of a new market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMarket {
    /// Price feed (aggregator proxy) address.
    pub price_feed: Address,
    /// Asset symbol.
    pub asset_name: String,
    /// Quote symbol.
    pub base_asset: String,
    /// Target price in 8-decimal feed units.
    pub target_price: U256,
    /// Unix timestamp at which the market resolves.
    pub resolution_time: u64,
}

/// Latest answer of a price-feed aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceReading {
    /// Aggregator round id.
    pub round_id: u128,
    /// Answer in feed units (negative answers clamp to zero).
    pub answer: U256,
    /// Unix timestamp of the round update.
    pub updated_at: i64,
}

impl PriceReading {
    /// Answer as a decimal price.
    pub fn price(&self) -> Decimal {
        units::to_decimal_lossy(self.answer, units::PRICE_DECIMALS)
    }

    /// Answer formatted as `$1,234.56`.
    pub fn formatted(&self) -> String {
        format::format_price(self.answer)
    }
}

/// Faucet state of the betting token for one wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaucetStatus {
    /// A claim is possible right now.
    pub can_claim: bool,
    /// Seconds until the next claim opens.
    pub seconds_until_next: u64,
    /// Tokens handed out per claim, in base units.
    pub faucet_amount: U256,
}

impl FaucetStatus {
    /// Display string for the claim button.
    pub fn display(&self) -> String {
        if self.can_claim || self.seconds_until_next == 0 {
            return "Ready to claim!".to_string();
        }
        let secs = i64::try_from(self.seconds_until_next).unwrap_or(i64::MAX);
        countdown::format_remaining(secs)
    }
}

/// Transaction hashes of an approve-then-bet flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetReceipt {
    /// Approval transaction, if the allowance had to be raised.
    pub approval: Option<TxHash>,
    /// The bet transaction.
    pub bet: TxHash,
}
