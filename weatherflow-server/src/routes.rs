//! Route handlers and error mapping for the weather API.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use weatherflow_core::{
    FetchOptions, Location, Units, WeatherError, WeatherReport, WeatherService,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WeatherService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/weather/current", get(current))
        .route("/weather/bulk", post(bulk))
        .with_state(state)
}

/// HTTP-facing error; upstream failures map onto gateway-style statuses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Upstream(#[from] WeatherError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Upstream(err) => {
                let status = match &err {
                    WeatherError::Provider { .. }
                    | WeatherError::Network(_)
                    | WeatherError::Parse(_) => StatusCode::BAD_GATEWAY,
                    WeatherError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                    WeatherError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
        };

        let body = Json(serde_json::json!({
            "message": message,
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct CurrentParams {
    city: Option<String>,
    country: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    /// Temperature units: C, F, K, BOTH, ALL.
    units: Option<Units>,
    #[serde(default)]
    detailed: bool,
    /// Bypass the cache for this request.
    #[serde(default)]
    no_cache: bool,
}

#[derive(Debug, Serialize)]
struct WeatherEnvelope {
    data: WeatherReport,
    message: String,
    status: u16,
}

async fn current(
    State(state): State<AppState>,
    Query(params): Query<CurrentParams>,
) -> Result<Json<WeatherEnvelope>, ApiError> {
    let location = Location {
        city: params.city,
        country: params.country,
        state: params.state,
        zip_code: params.zip_code,
        lat: params.lat,
        lon: params.lon,
    };

    if location.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one location field is required.".to_string(),
        ));
    }

    info!(query = %location.to_query(), "current weather request");

    let options = FetchOptions {
        units: params.units,
        detailed: params.detailed,
        use_cache: !params.no_cache,
    };
    let report = state.service.get_current(&location, &options).await?;

    Ok(Json(WeatherEnvelope {
        data: report,
        message: "ok".to_string(),
        status: 200,
    }))
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct BulkParams {
    units: Option<Units>,
    #[serde(default)]
    detailed: bool,
    #[serde(default)]
    no_cache: bool,
}

/// One slot per input location, in input order.
#[derive(Debug, Serialize)]
struct BulkItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<WeatherReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct BulkEnvelope {
    data: Vec<BulkItem>,
    message: String,
    status: u16,
}

async fn bulk(
    State(state): State<AppState>,
    Query(params): Query<BulkParams>,
    Json(request): Json<BulkRequest>,
) -> Result<Json<BulkEnvelope>, ApiError> {
    if request.locations.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one location is required.".to_string(),
        ));
    }

    info!(locations = request.locations.len(), "bulk weather request");

    let options = FetchOptions {
        units: params.units,
        detailed: params.detailed,
        use_cache: !params.no_cache,
    };
    let results = state.service.get_bulk(&request.locations, &options).await;

    let data = results
        .into_iter()
        .map(|result| match result {
            Ok(report) => BulkItem {
                data: Some(report),
                error: None,
            },
            Err(err) => BulkItem {
                data: None,
                error: Some(err.to_string()),
            },
        })
        .collect();

    Ok(Json(BulkEnvelope {
        data,
        message: "ok".to_string(),
        status: 200,
    }))
}
