//! Mock contract gateway for unit testing.
//!
//! This module provides an in-memory [`MockGateway`] implementing both
//! [`MarketGateway`] and [`TokenGateway`] so the store, aggregation and
//! transaction flows can be tested without a chain.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, TxHash, U256};

use crate::error::{GatewayError, TxError};

use super::gateway::{MarketGateway, TokenGateway};
use super::types::{Automation, FaucetStatus, Market, NewMarket, Side, UserBet};

/// A write recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `createMarket`.
    CreateMarket(NewMarket),
    /// `placeBet`.
    PlaceBet {
        /// Market address.
        market: Address,
        /// Stake in token units.
        amount: U256,
        /// Side.
        side: Side,
    },
    /// `claimPayout`.
    ClaimPayout {
        /// Market address.
        market: Address,
        /// Bet index.
        bet_index: u64,
    },
    /// `claimBonusReward`.
    ClaimBonus(Address),
    /// `emergencyResolve`.
    EmergencyResolve(Address),
    /// `approve`.
    Approve {
        /// Spender.
        spender: Address,
        /// Allowance.
        amount: U256,
    },
    /// `mint`.
    Mint {
        /// Recipient.
        to: Address,
        /// Amount in token units.
        amount: U256,
    },
    /// `claimFaucet`.
    ClaimFaucet,
}

/// Configuration for mock gateway behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Whether to fail factory reads.
    pub fail_factory: bool,
    /// Whether to fail bet-record reads.
    pub fail_bet_reads: bool,
    /// Whether to fail every write.
    pub fail_writes: bool,
    /// Whether to fail the token `decimals` read.
    pub fail_decimals: bool,
    /// Simulated latency in milliseconds.
    pub latency_ms: u64,
}

#[derive(Debug, Default)]
struct MockState {
    order: Vec<Address>,
    markets: HashMap<Address, Market>,
    failing_markets: HashSet<Address>,
    bets: HashMap<(Address, Address), Vec<UserBet>>,
    bonus_eligible: HashSet<(Address, Address)>,
    allowances: HashMap<(Address, Address), U256>,
    balances: HashMap<Address, U256>,
    faucet: Option<FaucetStatus>,
    calls: Vec<MockCall>,
}

/// Mock gateway for testing.
#[derive(Debug, Clone)]
pub struct MockGateway {
    /// Mock configuration.
    config: MockConfig,
    /// Shared chain state.
    state: Arc<Mutex<MockState>>,
    /// Reads served so far.
    reads: Arc<AtomicU64>,
    /// Address the mock signs as.
    sender: Address,
    /// Token decimals.
    decimals: u8,
}

impl MockGateway {
    /// Create a new mock gateway with default configuration.
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a mock gateway with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(MockState::default())),
            reads: Arc::new(AtomicU64::new(0)),
            sender: Address::repeat_byte(0xA1),
            decimals: 6,
        }
    }

    /// Address the mock signs as.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Add a market, appended to the factory list.
    pub fn add_market(&self, market: Market) {
        let mut state = self.state.lock().unwrap();
        if !state.markets.contains_key(&market.address) {
            state.order.push(market.address);
        }
        state.markets.insert(market.address, market);
    }

    /// Make reads of one market fail.
    pub fn fail_market(&self, address: Address) {
        self.state.lock().unwrap().failing_markets.insert(address);
    }

    /// Add a bet record for `user`; `bet_index` is assigned sequentially per market.
    pub fn add_bet(&self, market: Address, user: Address, amount: U256, side: Side, claimed: bool, payout: U256) {
        let mut state = self.state.lock().unwrap();
        let next_index = state
            .bets
            .iter()
            .filter(|((m, _), _)| *m == market)
            .map(|(_, bets)| bets.len() as u64)
            .sum();
        state.bets.entry((market, user)).or_default().push(UserBet {
            bet_index: next_index,
            amount,
            side,
            claimed,
            payout,
        });
    }

    /// Mark `user` as the unclaimed random bonus winner of `market`.
    pub fn set_bonus_eligible(&self, market: Address, user: Address) {
        self.state.lock().unwrap().bonus_eligible.insert((market, user));
    }

    /// Set the allowance `owner` granted `spender`.
    pub fn set_allowance(&self, owner: Address, spender: Address, amount: U256) {
        self.state.lock().unwrap().allowances.insert((owner, spender), amount);
    }

    /// Set a token balance.
    pub fn set_balance(&self, owner: Address, amount: U256) {
        self.state.lock().unwrap().balances.insert(owner, amount);
    }

    /// Set the faucet status returned for every user.
    pub fn set_faucet(&self, status: FaucetStatus) {
        self.state.lock().unwrap().faucet = Some(status);
    }

    /// Writes recorded so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of reads served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Clear all mock data.
    pub fn clear(&self) {
        *self.state.lock().unwrap() = MockState::default();
        self.reads.store(0, Ordering::SeqCst);
    }

    async fn simulate_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    fn record(&self, method: &'static str, address: Address, call: MockCall) -> Result<TxHash, TxError> {
        if self.config.fail_writes {
            return Err(TxError::failed(method, address, "Mock write failure"));
        }
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        Ok(TxHash::with_last_byte(state.calls.len() as u8))
    }

    fn bet_read_failure(&self, method: &'static str, market: Address) -> Result<(), GatewayError> {
        if self.config.fail_bet_reads {
            return Err(GatewayError::call(method, market, "Mock bet read failure"));
        }
        Ok(())
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketGateway for MockGateway {
    async fn markets_count(&self) -> Result<u64, GatewayError> {
        self.simulate_read().await;
        if self.config.fail_factory {
            return Err(GatewayError::call("getMarketsCount", "factory", "Mock factory failure"));
        }
        Ok(self.state.lock().unwrap().order.len() as u64)
    }

    async fn all_markets(&self) -> Result<Vec<Address>, GatewayError> {
        self.simulate_read().await;
        if self.config.fail_factory {
            return Err(GatewayError::call("getAllMarkets", "factory", "Mock factory failure"));
        }
        Ok(self.state.lock().unwrap().order.clone())
    }

    async fn market(&self, address: Address) -> Result<Market, GatewayError> {
        self.simulate_read().await;
        let state = self.state.lock().unwrap();
        if state.failing_markets.contains(&address) {
            return Err(GatewayError::call("market", address, "Mock market failure"));
        }
        state
            .markets
            .get(&address)
            .cloned()
            .ok_or_else(|| GatewayError::call("market", address, "execution reverted"))
    }

    async fn user_bet_count(&self, market: Address, user: Address) -> Result<u64, GatewayError> {
        self.simulate_read().await;
        self.bet_read_failure("getUserBetCount", market)?;
        let state = self.state.lock().unwrap();
        Ok(state.bets.get(&(market, user)).map_or(0, |bets| bets.len() as u64))
    }

    async fn user_bet(&self, market: Address, user: Address, index: u64) -> Result<UserBet, GatewayError> {
        self.simulate_read().await;
        self.bet_read_failure("getUserBet", market)?;
        let state = self.state.lock().unwrap();
        state
            .bets
            .get(&(market, user))
            .and_then(|bets| bets.get(index as usize))
            .cloned()
            .ok_or_else(|| GatewayError::call("getUserBet", market, "index out of bounds"))
    }

    async fn can_claim_bonus(&self, market: Address, user: Address) -> Result<bool, GatewayError> {
        self.simulate_read().await;
        self.bet_read_failure("canClaimBonus", market)?;
        Ok(self.state.lock().unwrap().bonus_eligible.contains(&(market, user)))
    }

    async fn create_market(&self, params: &NewMarket) -> Result<TxHash, TxError> {
        let hash = self.record("createMarket", Address::ZERO, MockCall::CreateMarket(params.clone()))?;
        let address = Address::from_word(hash);
        self.add_market(Market {
            address,
            asset_name: params.asset_name.clone(),
            base_asset: params.base_asset.clone(),
            target_price: params.target_price,
            resolution_time: i64::try_from(params.resolution_time).unwrap_or(i64::MAX),
            total_higher_bets: U256::ZERO,
            total_lower_bets: U256::ZERO,
            is_resolved: false,
            outcome: None,
            final_price: None,
            random_winner: None,
            bonus_amount: None,
            automation: Automation {
                is_automated: true,
                ..Automation::default()
            },
        });
        Ok(hash)
    }

    async fn place_bet(&self, market: Address, amount: U256, side: Side) -> Result<TxHash, TxError> {
        let hash = self.record("placeBet", market, MockCall::PlaceBet { market, amount, side })?;
        {
            let mut state = self.state.lock().unwrap();
            if let Some(m) = state.markets.get_mut(&market) {
                match side {
                    Side::Higher => m.total_higher_bets += amount,
                    Side::Lower => m.total_lower_bets += amount,
                }
            }
        }
        self.add_bet(market, self.sender, amount, side, false, U256::ZERO);
        Ok(hash)
    }

    async fn claim_payout(&self, market: Address, bet_index: u64) -> Result<TxHash, TxError> {
        let hash = self.record("claimPayout", market, MockCall::ClaimPayout { market, bet_index })?;
        let mut state = self.state.lock().unwrap();
        for bet in state
            .bets
            .iter_mut()
            .filter(|((m, _), _)| *m == market)
            .flat_map(|(_, bets)| bets.iter_mut())
            .filter(|bet| bet.bet_index == bet_index)
        {
            bet.claimed = true;
        }
        Ok(hash)
    }

    async fn claim_bonus(&self, market: Address) -> Result<TxHash, TxError> {
        let hash = self.record("claimBonusReward", market, MockCall::ClaimBonus(market))?;
        let sender = self.sender;
        self.state.lock().unwrap().bonus_eligible.remove(&(market, sender));
        Ok(hash)
    }

    async fn emergency_resolve(&self, market: Address) -> Result<TxHash, TxError> {
        let hash = self.record("emergencyResolve", market, MockCall::EmergencyResolve(market))?;
        if let Some(m) = self.state.lock().unwrap().markets.get_mut(&market) {
            m.is_resolved = true;
        }
        Ok(hash)
    }
}

impl TokenGateway for MockGateway {
    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, GatewayError> {
        self.simulate_read().await;
        let state = self.state.lock().unwrap();
        Ok(state.allowances.get(&(owner, spender)).copied().unwrap_or_default())
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<TxHash, TxError> {
        let hash = self.record("approve", spender, MockCall::Approve { spender, amount })?;
        self.set_allowance(self.sender, spender, amount);
        Ok(hash)
    }

    async fn balance_of(&self, owner: Address) -> Result<U256, GatewayError> {
        self.simulate_read().await;
        Ok(self.state.lock().unwrap().balances.get(&owner).copied().unwrap_or_default())
    }

    async fn decimals(&self) -> Result<u8, GatewayError> {
        self.simulate_read().await;
        if self.config.fail_decimals {
            return Err(GatewayError::call("decimals", "token", "Mock token failure"));
        }
        Ok(self.decimals)
    }

    async fn mint(&self, to: Address, amount: U256) -> Result<TxHash, TxError> {
        let hash = self.record("mint", to, MockCall::Mint { to, amount })?;
        let mut state = self.state.lock().unwrap();
        let balance = state.balances.entry(to).or_default();
        *balance = balance.saturating_add(amount);
        Ok(hash)
    }

    async fn faucet_status(&self, _user: Address) -> Result<FaucetStatus, GatewayError> {
        self.simulate_read().await;
        let state = self.state.lock().unwrap();
        Ok(state.faucet.clone().unwrap_or(FaucetStatus {
            can_claim: true,
            seconds_until_next: 0,
            faucet_amount: U256::from(100_000_000u64),
        }))
    }

    async fn claim_faucet(&self) -> Result<TxHash, TxError> {
        self.record("claimFaucet", Address::ZERO, MockCall::ClaimFaucet)
    }
}

/// Builder for creating mock markets with common patterns.
pub struct MockMarketBuilder {
    market: Market,
}

impl MockMarketBuilder {
    /// Create a new builder for a BTC/USD market at the given address.
    pub fn new(address: Address) -> Self {
        Self {
            market: Market {
                address,
                asset_name: "BTC".to_string(),
                base_asset: "USD".to_string(),
                target_price: U256::from(6_700_000_000_000u64),
                resolution_time: 1_704_207_840,
                total_higher_bets: U256::ZERO,
                total_lower_bets: U256::ZERO,
                is_resolved: false,
                outcome: None,
                final_price: None,
                random_winner: None,
                bonus_amount: None,
                automation: Automation {
                    is_automated: true,
                    ..Automation::default()
                },
            },
        }
    }

    /// Set the asset pair.
    pub fn pair(mut self, asset: &str, base: &str) -> Self {
        self.market.asset_name = asset.to_string();
        self.market.base_asset = base.to_string();
        self
    }

    /// Set the target price in 8-decimal feed units.
    pub fn target_price(mut self, target: U256) -> Self {
        self.market.target_price = target;
        self
    }

    /// Set the resolution time.
    pub fn resolves_at(mut self, resolution_time: i64) -> Self {
        self.market.resolution_time = resolution_time;
        self
    }

    /// Set both pools in token units.
    pub fn pools(mut self, higher: u64, lower: u64) -> Self {
        self.market.total_higher_bets = U256::from(higher);
        self.market.total_lower_bets = U256::from(lower);
        self
    }

    /// Mark the market resolved with the given outcome and settlement price.
    pub fn resolved(mut self, outcome: Side, final_price: U256) -> Self {
        self.market.is_resolved = true;
        self.market.outcome = Some(outcome);
        self.market.final_price = Some(final_price);
        self
    }

    /// Set the random bonus pool.
    pub fn bonus(mut self, amount: U256) -> Self {
        self.market.bonus_amount = Some(amount);
        self
    }

    /// Set the automation flags.
    pub fn automation(mut self, registered: bool, vrf_fulfilled: bool) -> Self {
        self.market.automation.registered = registered;
        self.market.automation.vrf_fulfilled = vrf_fulfilled;
        self
    }

    /// Build the mock market.
    pub fn build(self) -> Market {
        self.market
    }
}
