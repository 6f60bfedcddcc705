//! HTTP API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};
use utoipa::{IntoParams, ToSchema};

use crate::feeds::{self, FeedCache, FeedDescriptor, Network};
use crate::market::stats::{automation_stats, global_stats};
use crate::market::{filter_markets, parse_address, MarketBoard, MarketFilter, MarketView, StatsView};
use crate::metrics;
use crate::utils::now_unix;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Latest published market list.
    pub board: MarketBoard,
    /// Feed lists per network.
    pub feeds: Arc<FeedCache>,
    /// Decimals of the betting token.
    pub token_decimals: u32,
    /// Prometheus handle, when the exporter is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(board: MarketBoard, feeds: Arc<FeedCache>, token_decimals: u32) -> Self {
        Self {
            board,
            feeds,
            token_decimals,
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Error body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// What went wrong.
    pub error: String,
}

/// Handler error carrying its status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl ToString) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }

    fn not_found(message: impl ToString) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Status: "ok".
    #[schema(value_type = String)]
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    /// Whether a market list has been published.
    pub ready: bool,
    /// Published markets.
    pub markets: usize,
    /// Last refresh, RFC 3339.
    pub refreshed_at: Option<String>,
}

/// Market list query.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MarketQuery {
    /// `all`, `active` or `resolved`.
    #[param(value_type = Option<String>)]
    pub filter: Option<MarketFilter>,
    /// Case-insensitive question search.
    pub search: Option<String>,
}

/// Feed list query.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedQuery {
    /// `ethereum` or `sepolia`.
    pub network: Option<String>,
}

/// Feed lists for one network.
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedsData {
    /// Every suitable feed.
    pub feeds: Vec<FeedDescriptor>,
    /// Popular pairs, in display order.
    pub popular_feeds: Vec<FeedDescriptor>,
}

/// Feed endpoint envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct FeedsResponse {
    /// Whether the lists were loaded.
    pub success: bool,
    /// The lists; empty on failure.
    pub data: FeedsData,
    /// Failure reason.
    pub error: Option<String>,
}

/// Health check handler - always returns 200.
#[utoipa::path(get, path = "/health", responses((status = 200, body = HealthResponse)))]
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - 200 after the first published refresh, 503 before.
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, body = ReadyResponse),
        (status = 503, body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.board.is_ready().await;
    let response = ReadyResponse {
        ready: is_ready,
        markets: state.board.snapshot().await.len(),
        refreshed_at: state
            .board
            .refreshed_at()
            .await
            .and_then(|t| t.format(&Rfc3339).ok()),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Markets with odds and countdown, filtered and searched.
#[utoipa::path(
    get,
    path = "/api/v1/markets",
    params(MarketQuery),
    responses((status = 200, body = [MarketView]))
)]
pub async fn list_markets(
    State(state): State<AppState>,
    Query(query): Query<MarketQuery>,
) -> impl IntoResponse {
    let now = now_unix();
    let markets = state.board.snapshot().await;
    let views: Vec<MarketView> = filter_markets(
        &markets,
        query.filter.unwrap_or_default(),
        query.search.as_deref().unwrap_or(""),
        now,
    )
    .into_iter()
    .map(|m| MarketView::new(m, now, state.token_decimals))
    .collect();

    debug!(count = views.len(), "Markets listed");
    Json(views)
}

/// One market by address.
#[utoipa::path(
    get,
    path = "/api/v1/markets/{address}",
    params(("address" = String, Path, description = "Market contract address")),
    responses(
        (status = 200, body = MarketView),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn get_market(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<MarketView>, ApiError> {
    let address = parse_address(&address).map_err(ApiError::bad_request)?;
    let market = state
        .board
        .get(address)
        .await
        .ok_or_else(|| ApiError::not_found(format!("market {} not found", address)))?;
    Ok(Json(MarketView::new(&market, now_unix(), state.token_decimals)))
}

/// Global and automation statistics.
#[utoipa::path(get, path = "/api/v1/stats", responses((status = 200, body = StatsView)))]
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let markets = state.board.snapshot().await;
    let global = global_stats(&markets, now_unix());
    let automation = automation_stats(&markets);
    Json(StatsView::new(&global, &automation, state.token_decimals))
}

/// Suitable and popular price feeds for a network.
#[utoipa::path(
    get,
    path = "/api/chainlink-feeds",
    params(FeedQuery),
    responses(
        (status = 200, body = FeedsResponse),
        (status = 400, body = FeedsResponse),
        (status = 500, body = FeedsResponse)
    )
)]
pub async fn chainlink_feeds(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> impl IntoResponse {
    let network = match query.network.as_deref() {
        None => Network::default(),
        Some(raw) => match raw.parse::<Network>() {
            Ok(network) => network,
            Err(_) => {
                return feeds_failure(StatusCode::BAD_REQUEST, format!("unsupported network: {}", raw));
            }
        },
    };

    match state.feeds.get(network).await {
        Ok(list) => {
            let response = FeedsResponse {
                success: true,
                data: FeedsData {
                    popular_feeds: feeds::popular(&list),
                    feeds: list.as_ref().clone(),
                },
                error: None,
            };
            (StatusCode::OK, Json(response))
        }
        Err(e) => {
            warn!(network = %network, error = %e, "Feed list unavailable");
            feeds_failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn feeds_failure(status: StatusCode, error: String) -> (StatusCode, Json<FeedsResponse>) {
    (
        status,
        Json(FeedsResponse {
            success: false,
            data: FeedsData::default(),
            error: Some(error),
        }),
    )
}

/// Prometheus text exposition.
pub async fn prometheus(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => {
            metrics::set_markets_listed(state.board.snapshot().await.len());
            handle.render().into_response()
        }
        None => ApiError::not_found("metrics exporter not installed").into_response(),
    }
}
