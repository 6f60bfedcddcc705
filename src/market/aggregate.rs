//! Per-user aggregation over a market's bet records.
//!
//! Read paths degrade: any failed read is logged and yields a zeroed
//! aggregate. [`claim_all`] is a write path and surfaces its errors.

use alloy::primitives::{Address, TxHash, U256};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, warn};

use crate::error::{GatewayError, Result};

use super::gateway::MarketGateway;
use super::types::{PayoutInfo, Side, UserBet, UserBets};

/// Read every bet record of `user` in `market`, in index order.
pub async fn read_bets<G: MarketGateway>(
    gateway: &G,
    market: Address,
    user: Address,
    concurrency: usize,
) -> std::result::Result<Vec<UserBet>, GatewayError> {
    let count = gateway.user_bet_count(market, user).await?;
    debug!(market = %market, user = %user, count, "Reading bet records");

    stream::iter(0..count)
        .map(|index| gateway.user_bet(market, user, index))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Fold bet records into per-side totals.
///
/// `has_claimed` is false for a user without bets.
pub fn fold_bets(bets: &[UserBet]) -> UserBets {
    let mut folded = UserBets {
        has_claimed: !bets.is_empty(),
        ..UserBets::default()
    };

    for bet in bets {
        match bet.side {
            Side::Higher => folded.higher_bet = folded.higher_bet.saturating_add(bet.amount),
            Side::Lower => folded.lower_bet = folded.lower_bet.saturating_add(bet.amount),
        }
        folded.has_claimed &= bet.claimed;
        folded.bet_indices.push(bet.bet_index);
    }

    folded
}

/// Aggregate of `user`'s bets in `market`, zeroed if any read fails.
#[instrument(skip(gateway))]
pub async fn user_bets<G: MarketGateway>(
    gateway: &G,
    market: Address,
    user: Address,
    concurrency: usize,
) -> UserBets {
    match read_bets(gateway, market, user, concurrency).await {
        Ok(bets) => fold_bets(&bets),
        Err(e) => {
            warn!(market = %market, user = %user, error = %e, "Failed to read user bets");
            UserBets::default()
        }
    }
}

async fn try_payout_info<G: MarketGateway>(
    gateway: &G,
    market: Address,
    user: Address,
    concurrency: usize,
) -> std::result::Result<PayoutInfo, GatewayError> {
    let snapshot = gateway.market(market).await?;
    if !snapshot.is_resolved {
        return Ok(PayoutInfo::default());
    }

    let bets = read_bets(gateway, market, user, concurrency).await?;
    let winning_payout = bets
        .iter()
        .filter(|bet| is_claimable(bet))
        .fold(U256::ZERO, |sum, bet| sum.saturating_add(bet.payout));

    let has_bonus = gateway.can_claim_bonus(market, user).await?;
    let bonus_payout = if has_bonus {
        snapshot.bonus_amount.unwrap_or_default()
    } else {
        U256::ZERO
    };

    let has_winnings = !winning_payout.is_zero();
    Ok(PayoutInfo {
        winning_payout,
        bonus_payout,
        total_payout: winning_payout.saturating_add(bonus_payout),
        has_winnings,
        has_bonus,
        can_claim: has_winnings || has_bonus,
    })
}

/// What `user` can claim from `market`; zeros if unresolved or any read fails.
#[instrument(skip(gateway))]
pub async fn payout_info<G: MarketGateway>(
    gateway: &G,
    market: Address,
    user: Address,
    concurrency: usize,
) -> PayoutInfo {
    match try_payout_info(gateway, market, user, concurrency).await {
        Ok(info) => info,
        Err(e) => {
            warn!(market = %market, user = %user, error = %e, "Failed to compute payout info");
            PayoutInfo::default()
        }
    }
}

/// Claim every unclaimed winning bet, then the bonus if eligible.
#[instrument(skip(gateway))]
pub async fn claim_all<G: MarketGateway>(
    gateway: &G,
    market: Address,
    user: Address,
    concurrency: usize,
) -> Result<Vec<TxHash>> {
    let bets = read_bets(gateway, market, user, concurrency).await?;
    let mut hashes = Vec::new();

    for bet in bets.iter().filter(|bet| is_claimable(bet)) {
        info!(market = %market, bet_index = bet.bet_index, payout = %bet.payout, "Claiming payout");
        hashes.push(gateway.claim_payout(market, bet.bet_index).await?);
    }

    if gateway.can_claim_bonus(market, user).await? {
        info!(market = %market, "Claiming bonus reward");
        hashes.push(gateway.claim_bonus(market).await?);
    }

    Ok(hashes)
}

fn is_claimable(bet: &UserBet) -> bool {
    !bet.claimed && !bet.payout.is_zero()
}
