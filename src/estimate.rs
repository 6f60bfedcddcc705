//! Odds and potential-payout estimates derived from pool totals.
//!
//! The pool share of each side is the single source of truth: the percentage
//! view is the share itself and the decimal-odds view is its inverse
//! (`100 / pct`, which equals `pool / side`). Both are produced by [`odds`] so
//! every caller sees the same rounding.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::market::Side;
use crate::units;

/// Lowest decimal odds ever reported.
pub const MIN_DECIMAL_ODDS: Decimal = dec!(1.01);

/// Decimal odds reported for a side nobody has bet on yet.
pub const NO_LIQUIDITY_ODDS: Decimal = dec!(999);

/// Decimal odds when the whole pool is empty.
pub const EVEN_ODDS: Decimal = dec!(2);

/// Betting pool totals for both sides, in any consistent unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pools {
    /// Total staked on HIGHER.
    pub higher: Decimal,
    /// Total staked on LOWER.
    pub lower: Decimal,
}

impl Pools {
    /// Create pools from two non-negative totals.
    pub fn new(higher: Decimal, lower: Decimal) -> Self {
        Self {
            higher: higher.max(Decimal::ZERO),
            lower: lower.max(Decimal::ZERO),
        }
    }

    /// Parse pools from decimal strings; non-numeric input counts as zero.
    pub fn from_strs(higher: &str, lower: &str) -> Self {
        Self::new(units::parse_non_negative(higher), units::parse_non_negative(lower))
    }

    /// Combined pool, saturating at [`Decimal::MAX`].
    pub fn total(&self) -> Decimal {
        self.higher.saturating_add(self.lower)
    }

    /// Total staked on one side.
    pub fn side(&self, side: Side) -> Decimal {
        match side {
            Side::Higher => self.higher,
            Side::Lower => self.lower,
        }
    }

    /// Whether nobody has bet yet.
    pub fn is_empty(&self) -> bool {
        self.total().is_zero()
    }
}

/// Implied odds for both sides of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Odds {
    /// Share of the pool on HIGHER, in percent.
    pub higher_pct: Decimal,
    /// Share of the pool on LOWER, in percent.
    pub lower_pct: Decimal,
    /// Decimal odds for HIGHER (`pool / higher`).
    pub higher_decimal: Decimal,
    /// Decimal odds for LOWER (`pool / lower`).
    pub lower_decimal: Decimal,
}

impl Odds {
    /// Percentage for one side.
    pub fn pct(&self, side: Side) -> Decimal {
        match side {
            Side::Higher => self.higher_pct,
            Side::Lower => self.lower_pct,
        }
    }

    /// Decimal odds for one side.
    pub fn decimal(&self, side: Side) -> Decimal {
        match side {
            Side::Higher => self.higher_decimal,
            Side::Lower => self.lower_decimal,
        }
    }
}

/// Compute implied odds from pool totals.
pub fn odds(pools: Pools) -> Odds {
    if pools.is_empty() {
        return Odds {
            higher_pct: Decimal::ONE_HUNDRED / Decimal::TWO,
            lower_pct: Decimal::ONE_HUNDRED / Decimal::TWO,
            higher_decimal: EVEN_ODDS,
            lower_decimal: EVEN_ODDS,
        };
    }

    let higher_pct = higher_share(pools) * Decimal::ONE_HUNDRED;
    let lower_pct = Decimal::ONE_HUNDRED - higher_pct;

    Odds {
        higher_pct,
        lower_pct,
        higher_decimal: decimal_from_pct(higher_pct),
        lower_decimal: decimal_from_pct(lower_pct),
    }
}

/// Fraction of a non-empty pool staked on HIGHER, in `0..=1`.
fn higher_share(pools: Pools) -> Decimal {
    if let Some(total) = pools.higher.checked_add(pools.lower) {
        return pools.higher.checked_div(total).unwrap_or(Decimal::ONE / Decimal::TWO);
    }

    // higher / (higher + lower) == 1 / (1 + lower / higher)
    pools
        .lower
        .checked_div(pools.higher)
        .and_then(|ratio| ratio.checked_add(Decimal::ONE))
        .map(|denominator| Decimal::ONE / denominator)
        .unwrap_or(Decimal::ZERO)
}

fn decimal_from_pct(pct: Decimal) -> Decimal {
    if pct.is_zero() {
        return NO_LIQUIDITY_ODDS;
    }
    Decimal::ONE_HUNDRED
        .checked_div(pct)
        .unwrap_or(Decimal::MAX)
        .max(MIN_DECIMAL_ODDS)
}

/// Estimated payout if `amount` were the last bet placed on `side`.
///
/// Winners split the whole pool in proportion to stake, so the estimate is
/// `amount * (pool + amount) / (side + amount)`. Figures too large for a
/// [`Decimal`] saturate at [`Decimal::MAX`].
pub fn potential_payout(amount: Decimal, side: Side, pools: Pools) -> Decimal {
    if amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let new_pool = pools.total().saturating_add(amount);
    let new_side = pools.side(side).saturating_add(amount);
    if new_side.is_zero() {
        return Decimal::ZERO;
    }

    amount
        .checked_mul(new_pool)
        .and_then(|stake| stake.checked_div(new_side))
        .or_else(|| amount.checked_div(new_side).and_then(|share| share.checked_mul(new_pool)))
        .unwrap_or(Decimal::MAX)
}

/// [`potential_payout`] for a raw user-entered amount; non-numeric input yields zero.
pub fn potential_payout_str(amount: &str, side: Side, pools: Pools) -> Decimal {
    potential_payout(units::parse_non_negative(amount), side, pools)
}
