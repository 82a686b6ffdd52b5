use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use hivesplit_engine::{Distributor, Filter, PaymentConfig};
use hivesplit_types::{DistributionResult, DynamicPayoutReport};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared server state: one distributor, one validated payment config.
#[derive(Clone)]
pub struct AppState {
    pub distributor: Distributor,
    pub payment: PaymentConfig,
    pub node_id: String,
    pub default_pool_hive: f64,
    pub default_interest_percent: f64,
    pub start_time: Instant,
    pub req_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(
        distributor: Distributor,
        payment: PaymentConfig,
        node_id: String,
        default_pool_hive: f64,
        default_interest_percent: f64,
    ) -> Self {
        Self {
            distributor,
            payment,
            node_id,
            default_pool_hive,
            default_interest_percent,
            start_time: Instant::now(),
            req_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    node_id: String,
    account: String,
    uptime_secs: u64,
    req_total: u64,
}

/// Query contract shared by the payout and distribution routes.
///
/// `filter` carries percent-encoded JSON; `pool` and `interest` override the
/// configured defaults. The numeric fields arrive as strings so a bad value
/// maps to this API's own 400 payload instead of the extractor's.
#[derive(Debug, Default, Deserialize)]
struct RunQuery {
    #[serde(default)]
    filter: Option<String>,
    #[serde(default)]
    pool: Option<String>,
    #[serde(default)]
    interest: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayoutsResponse {
    account: String,
    filter: Filter,
    report: DynamicPayoutReport,
    req_total: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DistributionResponse {
    account: String,
    filter: Filter,
    result: DistributionResult,
    req_total: u64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn bad_gateway<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    axum::serve(listener, app)
        .await
        .context("API server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind API listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind API listener on {addr}"))
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/v1/payouts", get(handle_payouts))
        .route("/api/v1/distribution", get(handle_distribution))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let req_total = state.record_request();
    Json(HealthResponse {
        status: "ok",
        node_id: state.node_id.clone(),
        account: state.payment.account().to_string(),
        uptime_secs: state.uptime_seconds(),
        req_total,
    })
}

/// Full dynamic-rate payout run.
async fn handle_payouts(
    State(state): State<SharedState>,
    Query(query): Query<RunQuery>,
) -> Result<Json<PayoutsResponse>, ApiError> {
    let req_total = state.record_request();
    let filter = decode_filter(query.filter.as_deref());
    let pool_base_hive =
        parse_amount(query.pool.as_deref(), "pool")?.unwrap_or(state.default_pool_hive);
    let interest_percent = parse_percent(query.interest.as_deref(), "interest")?
        .unwrap_or(state.default_interest_percent);

    let report = state
        .distributor
        .dynamic_payout(
            &state.payment,
            &filter,
            pool_base_hive,
            interest_percent,
            Utc::now(),
        )
        .await
        .map_err(|err| ApiError::bad_gateway(format!("chain gateway failure: {err}")))?;

    Ok(Json(PayoutsResponse {
        account: state.payment.account().to_string(),
        filter,
        report,
        req_total,
    }))
}

/// Static distribution preview: shares of the base pool, no dynamic rate.
async fn handle_distribution(
    State(state): State<SharedState>,
    Query(query): Query<RunQuery>,
) -> Result<Json<DistributionResponse>, ApiError> {
    let req_total = state.record_request();
    let filter = decode_filter(query.filter.as_deref());
    let pool_base_hive =
        parse_amount(query.pool.as_deref(), "pool")?.unwrap_or(state.default_pool_hive);
    let interest_percent = parse_percent(query.interest.as_deref(), "interest")?
        .unwrap_or(state.default_interest_percent);

    let result = state
        .distributor
        .distribution(
            state.payment.account(),
            &filter,
            pool_base_hive,
            interest_percent,
            Utc::now(),
        )
        .await
        .map_err(|err| ApiError::bad_gateway(format!("chain gateway failure: {err}")))?;

    Ok(Json(DistributionResponse {
        account: state.payment.account().to_string(),
        filter,
        result,
        req_total,
    }))
}

/// Decode the filter query value, falling back to unapplied defaults when
/// the payload cannot be decoded. The fallback is visible to callers as
/// `applied=false` on the echoed filter.
fn decode_filter(raw: Option<&str>) -> Filter {
    match raw {
        None => Filter::default(),
        Some(raw) => match Filter::from_encoded(raw) {
            Ok(filter) => filter,
            Err(err) => {
                warn!(error = %err, "undecodable filter payload, serving unfiltered defaults");
                Filter::unapplied()
            }
        },
    }
}

fn parse_amount(raw: Option<&str>, field: &str) -> Result<Option<f64>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = raw.parse::<f64>().map_err(|_| {
        ApiError::bad_request(format!("invalid {field}: expected a number, got {raw:?}"))
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(ApiError::bad_request(format!(
            "invalid {field}: must be a non-negative number"
        )));
    }
    Ok(Some(value))
}

fn parse_percent(raw: Option<&str>, field: &str) -> Result<Option<f64>, ApiError> {
    let value = parse_amount(raw, field)?;
    if let Some(value) = value {
        if value > 100.0 {
            return Err(ApiError::bad_request(format!(
                "invalid {field}: must not exceed 100"
            )));
        }
    }
    Ok(value)
}
