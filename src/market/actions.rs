//! Multi-step transaction flows built on the gateway traits.
//!
//! Every flow validates its input first; nothing is sent when validation
//! fails. Writes are never retried.

use alloy::primitives::{Address, TxHash, U256};
use tracing::{info, instrument, warn};

use crate::error::{Result, ValidationError};
use crate::units;

use super::gateway::{parse_address, MarketGateway, TokenGateway};
use super::types::{BetReceipt, NewMarket, Side};

/// Token decimals, falling back to `fallback` when the read fails.
pub async fn token_decimals<T: TokenGateway>(token: &T, fallback: u8) -> u32 {
    match token.decimals().await {
        Ok(decimals) => u32::from(decimals),
        Err(e) => {
            warn!(error = %e, fallback, "Failed to read token decimals");
            u32::from(fallback)
        }
    }
}

/// Stake `amount` (token-denominated text) on `side`, approving the market first if needed.
///
/// The allowance is raised to exactly the bet amount when it falls short.
#[instrument(skip(gateway))]
pub async fn place_bet<G>(
    gateway: &G,
    owner: Address,
    market: Address,
    amount: &str,
    side: Side,
    decimals: u32,
) -> Result<BetReceipt>
where
    G: MarketGateway + TokenGateway,
{
    let value = units::parse_amount(amount)?;
    let base_units = units::to_base_units(value, decimals)?;

    let balance = gateway.balance_of(owner).await?;
    if balance < base_units {
        return Err(ValidationError::InsufficientBalance {
            required: value,
            available: units::to_decimal_lossy(balance, decimals),
        }
        .into());
    }

    let allowance = gateway.allowance(owner, market).await?;
    let approval = if allowance < base_units {
        info!(market = %market, allowance = %allowance, required = %base_units, "Approving bet amount");
        Some(gateway.approve(market, base_units).await?)
    } else {
        None
    };

    let bet = gateway.place_bet(market, base_units, side).await?;
    info!(market = %market, side = %side, amount = %value, tx = %bet, "Bet placed");

    Ok(BetReceipt { approval, bet })
}

/// Validate user input for a new market.
///
/// `target_price` is parsed with the feed's 8 decimals; the resolution time
/// must be strictly after `now`.
pub fn validate_new_market(
    price_feed: &str,
    asset_name: &str,
    base_asset: &str,
    target_price: &str,
    resolution_time: i64,
    now: i64,
) -> std::result::Result<NewMarket, ValidationError> {
    let price_feed = parse_address(price_feed)?;
    if price_feed.is_zero() {
        return Err(ValidationError::InvalidAddress(price_feed.to_string()));
    }

    let asset_name = asset_name.trim();
    if asset_name.is_empty() {
        return Err(ValidationError::EmptyField("asset name"));
    }
    let base_asset = base_asset.trim();
    if base_asset.is_empty() {
        return Err(ValidationError::EmptyField("base asset"));
    }

    if resolution_time <= now {
        return Err(ValidationError::ResolutionInPast {
            resolution_time,
            now,
        });
    }

    Ok(NewMarket {
        price_feed,
        asset_name: asset_name.to_string(),
        base_asset: base_asset.to_string(),
        target_price: units::parse_units(target_price, units::PRICE_DECIMALS)?,
        resolution_time: resolution_time.unsigned_abs(),
    })
}

/// Deploy a validated market.
#[instrument(skip(gateway, params), fields(asset = %params.asset_name))]
pub async fn create_market<G: MarketGateway>(gateway: &G, params: &NewMarket) -> Result<TxHash> {
    let tx = gateway.create_market(params).await?;
    info!(tx = %tx, "Market created");
    Ok(tx)
}

/// Approve `spender` for `amount` (token-denominated text).
#[instrument(skip(token))]
pub async fn approve<T: TokenGateway>(
    token: &T,
    spender: Address,
    amount: &str,
    decimals: u32,
) -> Result<TxHash> {
    let base_units = units::parse_units(amount, decimals)?;
    Ok(token.approve(spender, base_units).await?)
}

/// Whether `owner` must approve `spender` before staking `amount` base units.
pub async fn needs_approval<T: TokenGateway>(
    token: &T,
    owner: Address,
    spender: Address,
    amount: U256,
) -> Result<bool> {
    Ok(token.allowance(owner, spender).await? < amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::market::mock::{MockCall, MockConfig, MockGateway, MockMarketBuilder};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const NOW: i64 = 1_700_000_000;
    const FEED: &str = "0x1b44F3514812d835EB1BDB0acB33d3fA3351Ee43";

    fn funded_gateway(market: Address) -> MockGateway {
        let gateway = MockGateway::new();
        gateway.add_market(MockMarketBuilder::new(market).pools(900_000_000, 100_000_000).build());
        gateway.set_balance(gateway.sender(), U256::from(1_000_000_000u64));
        gateway
    }

    #[tokio::test]
    async fn bet_approves_exact_shortfall_then_bets() {
        let market = Address::repeat_byte(5);
        let gateway = funded_gateway(market);
        let owner = gateway.sender();

        let receipt = place_bet(&gateway, owner, market, "100", Side::Higher, 6).await.unwrap();

        assert!(receipt.approval.is_some());
        assert_eq!(
            gateway.calls(),
            vec![
                MockCall::Approve { spender: market, amount: U256::from(100_000_000u64) },
                MockCall::PlaceBet { market, amount: U256::from(100_000_000u64), side: Side::Higher },
            ]
        );
    }

    #[tokio::test]
    async fn bet_skips_approval_when_allowance_covers_it() {
        let market = Address::repeat_byte(5);
        let gateway = funded_gateway(market);
        let owner = gateway.sender();
        gateway.set_allowance(owner, market, U256::MAX);

        let receipt = place_bet(&gateway, owner, market, "2.5", Side::Lower, 6).await.unwrap();

        assert_eq!(receipt.approval, None);
        assert_eq!(gateway.calls().len(), 1);
        assert!(!needs_approval(&gateway, owner, market, U256::from(1u64)).await.unwrap());
    }

    #[tokio::test]
    async fn invalid_amount_sends_nothing() {
        let market = Address::repeat_byte(5);
        let gateway = funded_gateway(market);

        for bad in ["", "0", "abc", "1.2345678"] {
            let result = place_bet(&gateway, gateway.sender(), market, bad, Side::Higher, 6).await;
            assert!(matches!(result, Err(AppError::Validation(_))), "{bad:?} accepted");
        }
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn insufficient_balance_is_rejected() {
        let market = Address::repeat_byte(5);
        let gateway = funded_gateway(market);

        let result = place_bet(&gateway, gateway.sender(), market, "5000", Side::Higher, 6).await;
        match result {
            Err(AppError::Validation(ValidationError::InsufficientBalance { required, available })) => {
                assert_eq!(required, dec!(5000));
                assert_eq!(available, dec!(1000));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn write_failure_surfaces_as_tx_error() {
        let market = Address::repeat_byte(5);
        let gateway = MockGateway::with_config(MockConfig {
            fail_writes: true,
            ..Default::default()
        });
        gateway.set_balance(gateway.sender(), U256::MAX);

        let result = place_bet(&gateway, gateway.sender(), market, "1", Side::Higher, 6).await;
        assert!(matches!(result, Err(AppError::Tx(_))));
    }

    #[test]
    fn new_market_parses_target_with_feed_decimals() {
        let params = validate_new_market(FEED, "BTC", " USD ", "67000.5", NOW + 3_600, NOW).unwrap();
        assert_eq!(params.target_price, U256::from(6_700_050_000_000u64));
        assert_eq!(params.base_asset, "USD");
        assert_eq!(params.resolution_time, (NOW + 3_600) as u64);
    }

    #[test]
    fn new_market_rejects_past_resolution() {
        assert_eq!(
            validate_new_market(FEED, "BTC", "USD", "1", NOW, NOW),
            Err(ValidationError::ResolutionInPast {
                resolution_time: NOW,
                now: NOW
            })
        );
        assert_eq!(
            validate_new_market(FEED, "", "USD", "1", NOW + 1, NOW),
            Err(ValidationError::EmptyField("asset name"))
        );
        assert!(validate_new_market("0x0000000000000000000000000000000000000000", "BTC", "USD", "1", NOW + 1, NOW).is_err());
    }

    #[tokio::test]
    async fn create_market_adds_market_to_factory() {
        let gateway = MockGateway::new();
        let params = validate_new_market(FEED, "BTC", "USD", "70000", NOW + 60, NOW).unwrap();

        create_market(&gateway, &params).await.unwrap();
        assert_eq!(gateway.markets_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn decimals_read_succeeds_on_mock() {
        assert_eq!(token_decimals(&MockGateway::new(), 18).await, 6);
    }

    #[tokio::test]
    async fn decimals_fall_back_to_configured_value() {
        let gateway = MockGateway::with_config(MockConfig {
            fail_decimals: true,
            ..Default::default()
        });
        assert_eq!(token_decimals(&gateway, 6).await, 6);
    }
}
