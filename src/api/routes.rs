//! HTTP API route definitions.

use axum::{routing::get, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::feeds::{FeedDescriptor, FeedDocs};
use crate::market::view::AutomationView;
use crate::market::{MarketView, StatsView};

use super::handlers::{
    chainlink_feeds, get_market, health, list_markets, prometheus, ready, stats, AppState, ErrorResponse,
    FeedsData, FeedsResponse, HealthResponse, ReadyResponse,
};

/// OpenAPI document for the JSON API.
#[derive(OpenApi)]
#[openapi(
    info(title = "nos-markets", description = "Price prediction markets read API"),
    paths(
        super::handlers::health,
        super::handlers::ready,
        super::handlers::list_markets,
        super::handlers::get_market,
        super::handlers::stats,
        super::handlers::chainlink_feeds
    ),
    components(schemas(
        HealthResponse,
        ReadyResponse,
        ErrorResponse,
        MarketView,
        StatsView,
        AutomationView,
        FeedsResponse,
        FeedsData,
        FeedDescriptor,
        FeedDocs
    ))
)]
pub struct ApiDoc;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Markets
        .route("/api/v1/markets", get(list_markets))
        .route("/api/v1/markets/:address", get(get_market))
        .route("/api/v1/stats", get(stats))
        // Feed directory
        .route("/api/chainlink-feeds", get(chainlink_feeds))
        .route("/metrics", get(prometheus))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::{FeedCache, FeedClient};
    use crate::market::{MarketBoard, MockMarketBuilder, Side};
    use crate::utils::now_unix;
    use alloy::primitives::{Address, U256};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state(board: MarketBoard) -> AppState {
        let feeds = FeedCache::new(
            FeedClient::with_base_url("http://127.0.0.1:9", 0),
            Duration::from_secs(60),
        );
        AppState::new(board, Arc::new(feeds), 6)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn decimal(value: &serde_json::Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    async fn populated_board() -> MarketBoard {
        let board = MarketBoard::new();
        let future = now_unix() + 86_400;
        board
            .publish(vec![
                MockMarketBuilder::new(Address::repeat_byte(1))
                    .resolves_at(future)
                    .pools(700_000_000, 300_000_000)
                    .build(),
                MockMarketBuilder::new(Address::repeat_byte(2))
                    .pair("ETH", "USD")
                    .resolves_at(1_704_207_840)
                    .pools(100_000_000, 0)
                    .resolved(Side::Higher, U256::from(350_000_000_000u64))
                    .build(),
            ])
            .await;
        board
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = create_router(state(MarketBoard::new()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_503_before_first_refresh() {
        let app = create_router(state(MarketBoard::new()));

        let (status, body) = get_json(app, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ready"], false);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_200_after_publish() {
        let app = create_router(state(populated_board().await));

        let (status, body) = get_json(app, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["markets"], 2);
    }

    #[tokio::test]
    async fn markets_endpoint_filters_and_reports_odds() {
        let board = populated_board().await;

        let (status, body) = get_json(create_router(state(board.clone())), "/api/v1/markets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = get_json(create_router(state(board.clone())), "/api/v1/markets?filter=active").await;
        let active = body.as_array().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(decimal(&active[0]["higherPct"]), dec!(70));
        assert_eq!(decimal(&active[0]["lowerPct"]), dec!(30));

        let (_, body) = get_json(create_router(state(board)), "/api/v1/markets?filter=resolved&search=eth").await;
        let resolved = body.as_array().unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0]["outcome"], "HIGHER");
    }

    #[tokio::test]
    async fn market_endpoint_validates_and_looks_up() {
        let board = populated_board().await;

        let uri = format!("/api/v1/markets/{}", Address::repeat_byte(1));
        let (status, body) = get_json(create_router(state(board.clone())), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assetName"], "BTC");

        let (status, _) = get_json(create_router(state(board.clone())), "/api/v1/markets/not-an-address").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/v1/markets/{}", Address::repeat_byte(9));
        let (status, _) = get_json(create_router(state(board)), &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_endpoint_counts_markets() {
        let app = create_router(state(populated_board().await));

        let (status, body) = get_json(app, "/api/v1/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["activeMarkets"], 1);
        assert_eq!(body["resolvedMarkets"], 1);
        assert_eq!(body["automation"]["automatedMarkets"], 2);
        assert_eq!(body["automation"]["automationRate"], "100.0%");
    }

    #[tokio::test]
    async fn feeds_endpoint_rejects_unknown_network() {
        let app = create_router(state(MarketBoard::new()));

        let (status, body) = get_json(app, "/api/chainlink-feeds?network=solana").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["feeds"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn feeds_endpoint_reports_fetch_failure() {
        let app = create_router(state(MarketBoard::new()));

        let (status, body) = get_json(app, "/api/chainlink-feeds?network=sepolia").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn metrics_endpoint_is_404_without_exporter() {
        let app = create_router(state(MarketBoard::new()));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn openapi_document_lists_paths() {
        let app = create_router(state(MarketBoard::new()));

        let (status, body) = get_json(app, "/api-docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/v1/markets"].is_object());
        assert!(body["paths"]["/api/chainlink-feeds"].is_object());
    }
}
