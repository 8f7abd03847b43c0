//! HTTP API routes
//!
//! Geocoding proxy endpoints. Upstream payloads pass through untouched on
//! success; every failure is reported as `{"error": CODE}`.

use crate::constants::geo::{MAX_LAT, MAX_LNG};
use crate::coord::Coordinate;
use crate::error::Error;
use crate::geo::SearchOptions;
use crate::server::state::AppState;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/geocode/reverse", get(reverse_handler))
        .route("/geocode/search", get(search_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiError {
    fn code(error: &str) -> Self {
        Self {
            error: error.to_string(),
            status: None,
        }
    }

    /// HTTP status this error is reported with
    fn http_status(&self) -> StatusCode {
        match self.error.as_str() {
            "INVALID_PARAMS" => StatusCode::BAD_REQUEST,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.http_status(), Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        debug!(error = %err, "proxy request failed");
        match err {
            Error::InvalidParams(_) => ApiError::code("INVALID_PARAMS"),
            Error::RateLimited => ApiError::code("RATE_LIMITED"),
            Error::Upstream { status } => ApiError {
                error: "UPSTREAM_ERROR".to_string(),
                status: Some(status),
            },
            _ => ApiError::code("FETCH_FAILED"),
        }
    }
}

/// Reverse query string; every field is optional so validation owns the error
#[derive(Debug, Deserialize)]
pub struct ReverseParams {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

/// Search query string
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub countrycodes: Option<String>,
    pub limit: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
}

fn parse_float(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

/// Clamp a caller-supplied limit; unparseable values fall back to the default
fn parse_limit(value: Option<&str>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|l| l.clamp(1, 10) as u32)
}

/// Reverse geocode proxy
///
/// GET /geocode/reverse?lat=..&lng=..
async fn reverse_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReverseParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let lat = parse_float(params.lat.as_deref());
    let lng = parse_float(params.lng.as_deref());
    let (Some(lat), Some(lng)) = (lat, lng) else {
        return Err(ApiError::code("INVALID_PARAMS"));
    };

    let raw = state.gateway.reverse_raw(Coordinate::new(lat, lng)).await?;
    Ok(Json(raw))
}

/// Forward search proxy
///
/// GET /geocode/search?q=..&countrycodes=..&limit=..&lat=..&lng=..
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = params.q.unwrap_or_default();

    // Any finite pair biases the search; out-of-range values are pulled onto the globe
    let bias = match (parse_float(params.lat.as_deref()), parse_float(params.lng.as_deref())) {
        (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some(Coordinate::new(
            lat.clamp(-MAX_LAT, MAX_LAT),
            lng.clamp(-MAX_LNG, MAX_LNG),
        )),
        _ => None,
    };

    let options = SearchOptions {
        limit: parse_limit(params.limit.as_deref()),
        country_codes: params.countrycodes,
        bias,
    };

    let raw = state.gateway.search_raw(&query, &options).await?;
    Ok(Json(raw))
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe
///
/// GET /health
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
