//! Integration tests for the markets client.
//!
//! Feed directory tests run against a local `wiremock` server; market flows
//! run against the in-memory `MockGateway`. Nothing here touches a real chain.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nos_markets::api::{create_router, AppState};
use nos_markets::error::{AppError, ValidationError};
use nos_markets::feeds::{FeedCache, FeedClient, Network};
use nos_markets::market::actions::{place_bet, token_decimals, validate_new_market};
use nos_markets::market::aggregate::{claim_all, payout_info, user_bets};
use nos_markets::market::stats::{automation_stats, global_stats};
use nos_markets::market::{
    MarketBoard, MarketStore, MarketView, MockCall, MockGateway, MockMarketBuilder, RefreshOutcome, Side,
    StatsView, StoreSettings,
};

const SEPOLIA_PATH: &str = "/feeds-ethereum-testnet-sepolia.json";

fn directory() -> Value {
    json!([
        {
            "name": "BTC / USD",
            "pair": ["BTC", "USD"],
            "contractAddress": "0x0000000000000000000000000000000000000b7c",
            "proxyAddress": null,
            "heartbeat": 3600,
            "decimals": 8,
            "assetName": "Bitcoin",
            "feedCategory": "low",
            "feedType": "Crypto",
            "docs": { "hidden": false, "baseAsset": "BTC", "quoteAsset": "USD" }
        },
        {
            "name": "SOL / USD",
            "pair": ["SOL", "USD"],
            "contractAddress": "0x00000000000000000000000000000000000050aa",
            "proxyAddress": "0x00000000000000000000000000000000000050ab",
            "heartbeat": 86400,
            "decimals": 8,
            "assetName": "Solana",
            "feedCategory": "medium",
            "feedType": "Crypto",
            "docs": null
        },
        {
            "name": "OLD / USD",
            "pair": ["OLD", "USD"],
            "contractAddress": "0x0000000000000000000000000000000000000011",
            "feedCategory": "deprecated",
            "feedType": "Crypto"
        },
        {
            "name": "NOWHERE / USD",
            "pair": ["NOWHERE", "USD"],
            "contractAddress": "0x0000000000000000000000000000000000000000",
            "feedCategory": "low"
        }
    ])
}

fn fast_client(server: &MockServer, retries: u32) -> FeedClient {
    FeedClient::with_base_url(server.uri(), retries).backoff(Duration::from_millis(10))
}

#[tokio::test]
async fn feed_client_filters_and_overrides_directory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEPOLIA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(directory()))
        .expect(1)
        .mount(&server)
        .await;

    let feeds = fast_client(&server, 0).fetch(Network::Sepolia).await.unwrap();

    let names: Vec<String> = feeds.iter().map(|f| f.display_name()).collect();
    assert_eq!(names, vec!["BTC/USD", "SOL/USD"]);
    // Known Sepolia proxy replaces the listed BTC address
    assert_eq!(
        feeds[0].canonical_address(),
        Some("0x1b44F3514812d835EB1BDB0acB33d3fA3351Ee43")
    );
    assert_eq!(
        feeds[1].canonical_address(),
        Some("0x00000000000000000000000000000000000050ab")
    );
}

#[tokio::test]
async fn feed_client_retries_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEPOLIA_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEPOLIA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(directory()))
        .expect(1)
        .mount(&server)
        .await;

    let feeds = fast_client(&server, 2).fetch(Network::Sepolia).await.unwrap();
    assert_eq!(feeds.len(), 2);
}

#[tokio::test]
async fn feed_client_gives_up_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEPOLIA_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let err = fast_client(&server, 1).fetch(Network::Sepolia).await.unwrap_err();
    assert!(err.to_string().contains("HTTP 503"), "unexpected error: {}", err);
}

#[tokio::test]
async fn feed_cache_serves_second_request_from_memory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEPOLIA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(directory()))
        .expect(1)
        .mount(&server)
        .await;

    let cache = FeedCache::new(fast_client(&server, 0), Duration::from_secs(60));
    let first = cache.get(Network::Sepolia).await.unwrap();
    let second = cache.get(Network::Sepolia).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn feeds_endpoint_returns_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEPOLIA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(directory()))
        .mount(&server)
        .await;

    let cache = Arc::new(FeedCache::new(fast_client(&server, 0), Duration::from_secs(60)));
    let app = create_router(AppState::new(MarketBoard::new(), cache, 6));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/chainlink-feeds?network=sepolia")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["error"], Value::Null);
    assert_eq!(body["data"]["feeds"].as_array().unwrap().len(), 2);
    // Popular feeds follow the fixed pair order
    let popular: Vec<&str> = body["data"]["popularFeeds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(popular, vec!["BTC / USD", "SOL / USD"]);
}

fn market_address() -> Address {
    Address::repeat_byte(0x42)
}

#[tokio::test(start_paused = true)]
async fn refreshed_markets_feed_views_and_stats() {
    let gateway = Arc::new(MockGateway::new());
    gateway.add_market(
        MockMarketBuilder::new(market_address())
            .resolves_at(10_000)
            .pools(700_000_000, 300_000_000)
            .automation(true, false)
            .build(),
    );
    gateway.add_market(
        MockMarketBuilder::new(Address::repeat_byte(0x43))
            .pair("ETH", "USD")
            .resolves_at(1_000)
            .pools(50_000_000, 50_000_000)
            .resolved(Side::Lower, U256::from(300_000_000_000u64))
            .automation(true, true)
            .build(),
    );

    let store = MarketStore::new(gateway, StoreSettings::default());
    assert_eq!(store.refresh().await, RefreshOutcome::Updated(2));

    let markets = store.board().snapshot().await;
    let view = MarketView::new(&markets[0], 2_000, 6);
    assert_eq!(view.higher_pct, dec!(70));
    assert_eq!(view.lower_pct, dec!(30));
    assert_eq!(view.status, "Active");

    let stats = StatsView::new(&global_stats(&markets, 2_000), &automation_stats(&markets), 6);
    assert_eq!(stats.active_markets, 1);
    assert_eq!(stats.total_markets, 1);
    assert_eq!(stats.resolved_markets, 1);
    assert_eq!(stats.total_pool, "1,100.00");
    assert_eq!(stats.automation.active_automations, 1);
    assert_eq!(stats.automation.resolved_with_vrf, 1);
}

#[tokio::test]
async fn bet_flow_approves_shortfall_then_bets() {
    let gateway = MockGateway::new();
    let owner = gateway.sender();
    gateway.add_market(MockMarketBuilder::new(market_address()).build());
    gateway.set_balance(owner, U256::from(50_000_000u64));
    gateway.set_allowance(owner, market_address(), U256::from(1_000_000u64));

    let decimals = token_decimals(&gateway, 18).await;
    assert_eq!(decimals, 6);

    let receipt = place_bet(&gateway, owner, market_address(), "12.5", Side::Lower, decimals)
        .await
        .unwrap();
    assert!(receipt.approval.is_some());
    assert_eq!(
        gateway.calls(),
        vec![
            MockCall::Approve {
                spender: market_address(),
                amount: U256::from(12_500_000u64)
            },
            MockCall::PlaceBet {
                market: market_address(),
                amount: U256::from(12_500_000u64),
                side: Side::Lower
            },
        ]
    );

    // Allowance now covers the same stake, so no second approval
    gateway.clear();
    gateway.add_market(MockMarketBuilder::new(market_address()).build());
    gateway.set_balance(owner, U256::from(50_000_000u64));
    gateway.set_allowance(owner, market_address(), U256::from(12_500_000u64));
    let receipt = place_bet(&gateway, owner, market_address(), "12.5", Side::Higher, decimals)
        .await
        .unwrap();
    assert_eq!(receipt.approval, None);

    let bets = user_bets(&gateway, market_address(), owner, 1).await;
    assert_eq!(bets.higher_bet, U256::from(12_500_000u64));
    assert!(!bets.has_claimed);
}

#[tokio::test]
async fn invalid_input_sends_nothing() {
    let gateway = MockGateway::new();
    let owner = gateway.sender();
    gateway.set_balance(owner, U256::from(1_000_000u64));

    let err = place_bet(&gateway, owner, market_address(), "0", Side::Higher, 6)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ValidationError::InvalidAmount(_))));

    let err = place_bet(&gateway, owner, market_address(), "5", Side::Higher, 6)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::InsufficientBalance { .. })
    ));

    let err = validate_new_market(
        "0x694AA1769357215DE4FAC081bf1f309aDC325306",
        "ETH",
        "USD",
        "3500",
        100,
        200,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::ResolutionInPast { .. }));

    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn claim_all_collects_winnings_and_bonus() {
    let gateway = MockGateway::new();
    let user = gateway.sender();
    gateway.add_market(
        MockMarketBuilder::new(market_address())
            .resolves_at(1_000)
            .pools(300_000_000, 100_000_000)
            .resolved(Side::Higher, U256::from(7_000_000_000_000u64))
            .bonus(U256::from(5_000_000u64))
            .build(),
    );
    gateway.add_bet(market_address(), user, U256::from(100_000_000u64), Side::Higher, false, U256::from(130_000_000u64));
    gateway.add_bet(market_address(), user, U256::from(50_000_000u64), Side::Lower, false, U256::ZERO);
    gateway.add_bet(market_address(), user, U256::from(20_000_000u64), Side::Higher, true, U256::from(26_000_000u64));
    gateway.set_bonus_eligible(market_address(), user);

    let payout = payout_info(&gateway, market_address(), user, 2).await;
    assert_eq!(payout.winning_payout, U256::from(130_000_000u64));
    assert_eq!(payout.bonus_payout, U256::from(5_000_000u64));
    assert!(payout.can_claim);

    let hashes = claim_all(&gateway, market_address(), user, 2).await.unwrap();
    assert_eq!(hashes.len(), 2);
    assert_eq!(
        gateway.calls(),
        vec![
            MockCall::ClaimPayout {
                market: market_address(),
                bet_index: 0
            },
            MockCall::ClaimBonus(market_address()),
        ]
    );

    let after = payout_info(&gateway, market_address(), user, 2).await;
    assert!(!after.can_claim);
}
