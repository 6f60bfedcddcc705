//! Contract gateway: reads and writes against the deployed market contracts.
//!
//! [`MarketGateway`] and [`TokenGateway`] are the seams the rest of the crate
//! programs against; [`AlloyGateway`] implements both over JSON-RPC and
//! [`super::mock::MockGateway`] implements them in memory for tests.

use std::future::Future;
use std::str::FromStr;

use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{GatewayError, TxError, ValidationError};
use crate::metrics;

use super::contracts::{IAggregatorV3, IMarketFactory, INosToken, IPredictionMarket};
use super::types::{Automation, FaucetStatus, Market, NewMarket, PriceReading, Side, UserBet};

/// Reads and writes on the market factory and per-market contracts.
pub trait MarketGateway: Send + Sync {
    /// Number of markets deployed by the factory.
    fn markets_count(&self) -> impl Future<Output = Result<u64, GatewayError>> + Send;

    /// Addresses of every deployed market, oldest first.
    fn all_markets(&self) -> impl Future<Output = Result<Vec<Address>, GatewayError>> + Send;

    /// Current snapshot of one market.
    fn market(&self, address: Address) -> impl Future<Output = Result<Market, GatewayError>> + Send;

    /// Number of bet records `user` holds in `market`.
    fn user_bet_count(
        &self,
        market: Address,
        user: Address,
    ) -> impl Future<Output = Result<u64, GatewayError>> + Send;

    /// The `index`-th bet record of `user` in `market`.
    fn user_bet(
        &self,
        market: Address,
        user: Address,
        index: u64,
    ) -> impl Future<Output = Result<UserBet, GatewayError>> + Send;

    /// Whether `user` won the random bonus and has not claimed it.
    fn can_claim_bonus(
        &self,
        market: Address,
        user: Address,
    ) -> impl Future<Output = Result<bool, GatewayError>> + Send;

    /// Deploy a new market through the factory.
    fn create_market(&self, params: &NewMarket) -> impl Future<Output = Result<TxHash, TxError>> + Send;

    /// Stake `amount` token units on `side`.
    fn place_bet(
        &self,
        market: Address,
        amount: U256,
        side: Side,
    ) -> impl Future<Output = Result<TxHash, TxError>> + Send;

    /// Claim the payout of one bet.
    fn claim_payout(
        &self,
        market: Address,
        bet_index: u64,
    ) -> impl Future<Output = Result<TxHash, TxError>> + Send;

    /// Claim the random bonus.
    fn claim_bonus(&self, market: Address) -> impl Future<Output = Result<TxHash, TxError>> + Send;

    /// Force resolution of a market past its resolution time.
    fn emergency_resolve(&self, market: Address) -> impl Future<Output = Result<TxHash, TxError>> + Send;
}

/// Reads and writes on the betting token.
pub trait TokenGateway: Send + Sync {
    /// Token units `spender` may pull from `owner`.
    fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<U256, GatewayError>> + Send;

    /// Allow `spender` to pull `amount` token units.
    fn approve(&self, spender: Address, amount: U256) -> impl Future<Output = Result<TxHash, TxError>> + Send;

    /// Token balance of `owner`.
    fn balance_of(&self, owner: Address) -> impl Future<Output = Result<U256, GatewayError>> + Send;

    /// Token decimals.
    fn decimals(&self) -> impl Future<Output = Result<u8, GatewayError>> + Send;

    /// Mint test tokens to `to`.
    fn mint(&self, to: Address, amount: U256) -> impl Future<Output = Result<TxHash, TxError>> + Send;

    /// Faucet availability for `user`.
    fn faucet_status(&self, user: Address) -> impl Future<Output = Result<FaucetStatus, GatewayError>> + Send;

    /// Claim from the faucet.
    fn claim_faucet(&self) -> impl Future<Output = Result<TxHash, TxError>> + Send;
}

/// Parse a 0x-prefixed hex address.
pub fn parse_address(value: &str) -> Result<Address, ValidationError> {
    Address::from_str(value.trim()).map_err(|_| ValidationError::InvalidAddress(value.to_string()))
}

/// JSON-RPC backed gateway.
#[derive(Clone)]
pub struct AlloyGateway {
    /// Provider, wallet-filled when a signer is configured.
    provider: DynProvider,
    /// Market factory address.
    factory: Address,
    /// Betting token address.
    token: Address,
    /// Address of the configured signer.
    sender: Option<Address>,
}

impl AlloyGateway {
    /// Connect to the configured RPC endpoint, optionally with a signer for writes.
    pub fn connect(config: &Config, signer: Option<PrivateKeySigner>) -> crate::Result<Self> {
        let url: url::Url = config.rpc_url.parse().map_err(|e: url::ParseError| {
            GatewayError::InvalidRpcUrl {
                url: config.rpc_url.clone(),
                reason: e.to_string(),
            }
        })?;

        let factory = parse_address(&config.market_factory_address)?;
        let token = parse_address(&config.token_address)?;

        let (provider, sender) = match signer {
            Some(signer) => {
                let sender = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(url)
                    .erased();
                (provider, Some(sender))
            }
            None => (ProviderBuilder::new().connect_http(url).erased(), None),
        };

        debug!(factory = %factory, token = %token, signer = ?sender, "Gateway connected");

        Ok(Self {
            provider,
            factory,
            token,
            sender,
        })
    }

    /// Address of the configured signer.
    pub fn sender(&self) -> Option<Address> {
        self.sender
    }

    /// Market factory address.
    pub fn factory(&self) -> Address {
        self.factory
    }

    /// Betting token address.
    pub fn token(&self) -> Address {
        self.token
    }

    /// Latest answer of a price-feed aggregator.
    #[instrument(skip(self))]
    pub async fn latest_round(&self, feed: Address) -> Result<PriceReading, GatewayError> {
        let _timer = metrics::timer_rpc("latestRoundData");
        let round = IAggregatorV3::new(feed, self.provider.clone())
            .latestRoundData()
            .call()
            .await
            .map_err(|e| GatewayError::call("latestRoundData", feed, e))?;

        let answer = if round.answer.is_negative() {
            warn!(feed = %feed, "Negative feed answer clamped to zero");
            U256::ZERO
        } else {
            round.answer.into_raw()
        };

        Ok(PriceReading {
            round_id: round.roundId.saturating_to::<u128>(),
            answer,
            updated_at: unix_seconds(round.updatedAt),
        })
    }

    fn require_signer(&self) -> Result<(), TxError> {
        match self.sender {
            Some(_) => Ok(()),
            None => Err(TxError::NoSigner),
        }
    }
}

/// Wait for a sent transaction to be mined, recording the outcome.
async fn confirm(
    method: &'static str,
    address: Address,
    pending: PendingTransactionBuilder<Ethereum>,
) -> Result<TxHash, TxError> {
    let sent = *pending.tx_hash();
    metrics::inc_tx_sent(method);
    info!(method, address = %address, tx = %sent, "Transaction sent");

    match pending.get_receipt().await {
        Ok(receipt) => settle(method, address, receipt.transaction_hash(), receipt.status()),
        Err(e) => {
            metrics::inc_tx_failed(method);
            Err(TxError::failed(method, address, e))
        }
    }
}

/// Turn a mined receipt into the write's outcome; a reverted write is a failure.
fn settle(method: &'static str, address: Address, hash: TxHash, succeeded: bool) -> Result<TxHash, TxError> {
    if succeeded {
        info!(method, tx = %hash, "Transaction confirmed");
        Ok(hash)
    } else {
        warn!(method, tx = %hash, "Transaction reverted");
        metrics::inc_tx_failed(method);
        Err(TxError::failed(method, address, format!("transaction {} reverted", hash)))
    }
}

fn send_failed(method: &'static str, address: Address, err: impl std::fmt::Display) -> TxError {
    metrics::inc_tx_failed(method);
    TxError::failed(method, address, err)
}

fn unix_seconds(value: U256) -> i64 {
    i64::try_from(value.saturating_to::<u64>()).unwrap_or(i64::MAX)
}

fn market_from_raw(address: Address, raw: IPredictionMarket::marketReturn) -> Market {
    let resolved = raw.resolved;
    Market {
        address,
        asset_name: raw.assetName,
        base_asset: raw.baseAsset,
        target_price: raw.targetPrice,
        resolution_time: unix_seconds(raw.resolutionTime),
        total_higher_bets: raw.totalHigherBets,
        total_lower_bets: raw.totalLowerBets,
        is_resolved: resolved,
        outcome: resolved.then(|| Side::from_is_higher(raw.outcome)),
        final_price: resolved.then_some(raw.finalPrice),
        random_winner: (!raw.randomWinner.is_zero()).then_some(raw.randomWinner),
        bonus_amount: Some(raw.randomBonusPool),
        automation: Automation {
            is_automated: true,
            registered: raw.automationRegistered,
            vrf_fulfilled: raw.randomWinnerSelected,
        },
    }
}

impl MarketGateway for AlloyGateway {
    #[instrument(skip(self))]
    async fn markets_count(&self) -> Result<u64, GatewayError> {
        let _timer = metrics::timer_rpc("getMarketsCount");
        let count = IMarketFactory::new(self.factory, self.provider.clone())
            .getMarketsCount()
            .call()
            .await
            .map_err(|e| GatewayError::call("getMarketsCount", self.factory, e))?;
        Ok(count.saturating_to::<u64>())
    }

    #[instrument(skip(self))]
    async fn all_markets(&self) -> Result<Vec<Address>, GatewayError> {
        let _timer = metrics::timer_rpc("getAllMarkets");
        IMarketFactory::new(self.factory, self.provider.clone())
            .getAllMarkets()
            .call()
            .await
            .map_err(|e| GatewayError::call("getAllMarkets", self.factory, e))
    }

    #[instrument(skip(self))]
    async fn market(&self, address: Address) -> Result<Market, GatewayError> {
        let _timer = metrics::timer_rpc("market");
        let raw = IPredictionMarket::new(address, self.provider.clone())
            .market()
            .call()
            .await
            .map_err(|e| GatewayError::call("market", address, e))?;
        Ok(market_from_raw(address, raw))
    }

    #[instrument(skip(self))]
    async fn user_bet_count(&self, market: Address, user: Address) -> Result<u64, GatewayError> {
        let _timer = metrics::timer_rpc("getUserBetCount");
        let count = IPredictionMarket::new(market, self.provider.clone())
            .getUserBetCount(user)
            .call()
            .await
            .map_err(|e| GatewayError::call("getUserBetCount", market, e))?;
        Ok(count.saturating_to::<u64>())
    }

    #[instrument(skip(self))]
    async fn user_bet(&self, market: Address, user: Address, index: u64) -> Result<UserBet, GatewayError> {
        let _timer = metrics::timer_rpc("getUserBet");
        let contract = IPredictionMarket::new(market, self.provider.clone());
        let slot = U256::from(index);

        let bet_index = contract
            .userBets(user, slot)
            .call()
            .await
            .map_err(|e| GatewayError::call("userBets", market, e))?;
        let bet = contract
            .getUserBet(user, slot)
            .call()
            .await
            .map_err(|e| GatewayError::call("getUserBet", market, e))?;

        Ok(UserBet {
            bet_index: bet_index.saturating_to::<u64>(),
            amount: bet.amount,
            side: Side::from_is_higher(bet.isHigher),
            claimed: bet.claimed,
            payout: bet.payout,
        })
    }

    #[instrument(skip(self))]
    async fn can_claim_bonus(&self, market: Address, user: Address) -> Result<bool, GatewayError> {
        let _timer = metrics::timer_rpc("canClaimBonus");
        IPredictionMarket::new(market, self.provider.clone())
            .canClaimBonus(user)
            .call()
            .await
            .map_err(|e| GatewayError::call("canClaimBonus", market, e))
    }

    #[instrument(skip(self), fields(asset = %params.asset_name, base = %params.base_asset))]
    async fn create_market(&self, params: &NewMarket) -> Result<TxHash, TxError> {
        self.require_signer()?;
        let pending = IMarketFactory::new(self.factory, self.provider.clone())
            .createMarket(
                params.price_feed,
                params.asset_name.clone(),
                params.base_asset.clone(),
                params.target_price,
                U256::from(params.resolution_time),
            )
            .send()
            .await
            .map_err(|e| send_failed("createMarket", self.factory, e))?;
        confirm("createMarket", self.factory, pending).await
    }

    #[instrument(skip(self))]
    async fn place_bet(&self, market: Address, amount: U256, side: Side) -> Result<TxHash, TxError> {
        self.require_signer()?;
        let pending = IPredictionMarket::new(market, self.provider.clone())
            .placeBet(amount, side.is_higher())
            .send()
            .await
            .map_err(|e| send_failed("placeBet", market, e))?;
        confirm("placeBet", market, pending).await
    }

    #[instrument(skip(self))]
    async fn claim_payout(&self, market: Address, bet_index: u64) -> Result<TxHash, TxError> {
        self.require_signer()?;
        let pending = IPredictionMarket::new(market, self.provider.clone())
            .claimPayout(U256::from(bet_index))
            .send()
            .await
            .map_err(|e| send_failed("claimPayout", market, e))?;
        confirm("claimPayout", market, pending).await
    }

    #[instrument(skip(self))]
    async fn claim_bonus(&self, market: Address) -> Result<TxHash, TxError> {
        self.require_signer()?;
        let pending = IPredictionMarket::new(market, self.provider.clone())
            .claimBonusReward()
            .send()
            .await
            .map_err(|e| send_failed("claimBonusReward", market, e))?;
        confirm("claimBonusReward", market, pending).await
    }

    #[instrument(skip(self))]
    async fn emergency_resolve(&self, market: Address) -> Result<TxHash, TxError> {
        self.require_signer()?;
        let pending = IPredictionMarket::new(market, self.provider.clone())
            .emergencyResolve()
            .send()
            .await
            .map_err(|e| send_failed("emergencyResolve", market, e))?;
        confirm("emergencyResolve", market, pending).await
    }
}

impl TokenGateway for AlloyGateway {
    #[instrument(skip(self))]
    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, GatewayError> {
        let _timer = metrics::timer_rpc("allowance");
        INosToken::new(self.token, self.provider.clone())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| GatewayError::call("allowance", self.token, e))
    }

    #[instrument(skip(self))]
    async fn approve(&self, spender: Address, amount: U256) -> Result<TxHash, TxError> {
        self.require_signer()?;
        let pending = INosToken::new(self.token, self.provider.clone())
            .approve(spender, amount)
            .send()
            .await
            .map_err(|e| send_failed("approve", self.token, e))?;
        confirm("approve", self.token, pending).await
    }

    #[instrument(skip(self))]
    async fn balance_of(&self, owner: Address) -> Result<U256, GatewayError> {
        let _timer = metrics::timer_rpc("balanceOf");
        INosToken::new(self.token, self.provider.clone())
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| GatewayError::call("balanceOf", self.token, e))
    }

    #[instrument(skip(self))]
    async fn decimals(&self) -> Result<u8, GatewayError> {
        let _timer = metrics::timer_rpc("decimals");
        INosToken::new(self.token, self.provider.clone())
            .decimals()
            .call()
            .await
            .map_err(|e| GatewayError::call("decimals", self.token, e))
    }

    #[instrument(skip(self))]
    async fn mint(&self, to: Address, amount: U256) -> Result<TxHash, TxError> {
        self.require_signer()?;
        let pending = INosToken::new(self.token, self.provider.clone())
            .mint(to, amount)
            .send()
            .await
            .map_err(|e| send_failed("mint", self.token, e))?;
        confirm("mint", self.token, pending).await
    }

    #[instrument(skip(self))]
    async fn faucet_status(&self, user: Address) -> Result<FaucetStatus, GatewayError> {
        let _timer = metrics::timer_rpc("faucet");
        let token = INosToken::new(self.token, self.provider.clone());

        let can_claim = token
            .canClaimFaucet(user)
            .call()
            .await
            .map_err(|e| GatewayError::call("canClaimFaucet", self.token, e))?;
        let wait = token
            .timeUntilNextClaim(user)
            .call()
            .await
            .map_err(|e| GatewayError::call("timeUntilNextClaim", self.token, e))?;
        let faucet_amount = token
            .FAUCET_AMOUNT()
            .call()
            .await
            .map_err(|e| GatewayError::call("FAUCET_AMOUNT", self.token, e))?;

        Ok(FaucetStatus {
            can_claim,
            seconds_until_next: wait.saturating_to::<u64>(),
            faucet_amount,
        })
    }

    #[instrument(skip(self))]
    async fn claim_faucet(&self) -> Result<TxHash, TxError> {
        self.require_signer()?;
        let pending = INosToken::new(self.token, self.provider.clone())
            .claimFaucet()
            .send()
            .await
            .map_err(|e| send_failed("claimFaucet", self.token, e))?;
        confirm("claimFaucet", self.token, pending).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn parse_address_accepts_checksummed_and_lowercase() {
        assert!(parse_address("0x5FbDB2315678afecb367f032d93F642f64180aa3").is_ok());
        assert!(parse_address("0x5fbdb2315678afecb367f032d93f642f64180aa3").is_ok());
        assert_eq!(
            parse_address("0x12"),
            Err(ValidationError::InvalidAddress("0x12".to_string()))
        );
    }

    #[test]
    fn connect_without_signer_is_read_only() {
        let gateway = AlloyGateway::connect(&test_config(), None).unwrap();
        assert!(gateway.sender().is_none());
        assert!(matches!(gateway.require_signer(), Err(TxError::NoSigner)));
    }

    #[test]
    fn connect_rejects_bad_rpc_url() {
        let config = Config {
            rpc_url: "not a url".to_string(),
            ..test_config()
        };
        assert!(AlloyGateway::connect(&config, None).is_err());
    }

    #[test]
    fn unix_seconds_saturates() {
        assert_eq!(unix_seconds(U256::from(1_700_000_000u64)), 1_700_000_000);
        assert_eq!(unix_seconds(U256::MAX), i64::MAX);
    }

    #[test]
    fn mined_receipt_confirms_write() {
        let hash = TxHash::repeat_byte(7);
        assert_eq!(settle("placeBet", Address::repeat_byte(1), hash, true).unwrap(), hash);
    }

    #[test]
    fn reverted_receipt_fails_write() {
        let market = Address::repeat_byte(1);
        let err = settle("placeBet", market, TxHash::repeat_byte(7), false).unwrap_err();
        match err {
            TxError::Failed { method, address, reason } => {
                assert_eq!(method, "placeBet");
                assert_eq!(address, market.to_string());
                assert!(reason.contains("reverted"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
