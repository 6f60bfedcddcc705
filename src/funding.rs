//! Test-token funding: one-time auto-fund per wallet and the token faucet.

use alloy::primitives::{Address, TxHash};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::context::AppContext;
use crate::error::Result;
use crate::market::{FaucetStatus, TokenGateway};
use crate::units;

/// Outcome of an auto-fund attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundOutcome {
    /// Tokens were minted.
    Funded(TxHash),
    /// The wallet was funded before.
    AlreadyFunded,
}

/// Mint `amount` test tokens to `wallet` unless it was funded before.
///
/// The wallet is only recorded as funded once the mint is confirmed.
#[instrument(skip(token, context))]
pub async fn auto_fund<T: TokenGateway>(
    token: &T,
    context: &mut AppContext,
    wallet: Address,
    amount: Decimal,
    decimals: u32,
) -> Result<FundOutcome> {
    if context.is_funded(wallet) {
        info!(wallet = %wallet, "Wallet already funded");
        return Ok(FundOutcome::AlreadyFunded);
    }

    let base_units = units::to_base_units(amount, decimals)?;
    let tx = token.mint(wallet, base_units).await?;
    context.mark_funded(wallet)?;

    info!(wallet = %wallet, amount = %amount, tx = %tx, "Wallet funded with test tokens");
    Ok(FundOutcome::Funded(tx))
}

/// Faucet availability for `wallet`.
pub async fn faucet_status<T: TokenGateway>(token: &T, wallet: Address) -> Result<FaucetStatus> {
    Ok(token.faucet_status(wallet).await?)
}

/// Claim from the faucet if it is open for `wallet`; `None` while cooling down.
#[instrument(skip(token))]
pub async fn claim_faucet<T: TokenGateway>(token: &T, wallet: Address) -> Result<Option<TxHash>> {
    let status = token.faucet_status(wallet).await?;
    if !status.can_claim {
        info!(wallet = %wallet, wait = %status.display(), "Faucet not ready");
        return Ok(None);
    }
    let tx = token.claim_faucet().await?;
    info!(wallet = %wallet, tx = %tx, "Faucet claimed");
    Ok(Some(tx))
}
