use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::geocode::{Coordinate, GeocodeError, PlaceSource, ResolvedPlace};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

fn status_for(err: &GeocodeError) -> StatusCode {
    match err {
        GeocodeError::InvalidCoordinate { .. } => StatusCode::BAD_REQUEST,
        GeocodeError::NoResult { .. }
        | GeocodeError::MissingComponent(_)
        | GeocodeError::UnrecognizedResponse => StatusCode::NOT_FOUND,
        GeocodeError::Network(_)
        | GeocodeError::Remote { .. }
        | GeocodeError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        GeocodeError::Dataset(_) | GeocodeError::Import(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<GeocodeError> for ApiError {
    fn from(err: GeocodeError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            error!("lookup failed: {}", err);
        }
        ApiError(status, err.to_string())
    }
}

fn parse_coord(name: &str, raw: Option<&str>) -> Result<f64, ApiError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        api_error(StatusCode::BAD_REQUEST, format!("Missing '{}' parameter", name))
    })?;
    raw.parse::<f64>().map_err(|_| {
        api_error(StatusCode::BAD_REQUEST, format!("Invalid '{}' value: {}", name, raw))
    })
}

// ─── GET /api/place ──────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct PlaceQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct PlaceResponse {
    pub name: String,
    pub sub_region_name: String,
    pub region_name: String,
    pub source: PlaceSource,
}

impl From<ResolvedPlace> for PlaceResponse {
    fn from(r: ResolvedPlace) -> Self {
        Self {
            name: r.place.name,
            sub_region_name: r.place.sub_region_name,
            region_name: r.place.region_name,
            source: r.source,
        }
    }
}

pub async fn place(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlaceQuery>,
) -> Result<Json<PlaceResponse>, ApiError> {
    let start = Instant::now();

    let lat = parse_coord("lat", params.lat.as_deref())?;
    let lng = parse_coord("lng", params.lng.as_deref())?;
    let coord = Coordinate::validated(lat, lng)?;

    // Dataset query and remote call both block.
    let resolved = tokio::task::spawn_blocking(move || state.locate(coord.latitude, coord.longitude))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    info!(
        lat,
        lng,
        source = %resolved.source,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "GET /api/place"
    );

    Ok(Json(resolved.into()))
}

// ─── GET /health ─────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Stored coordinate points, not distinct features.
    pub points: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let points = tokio::task::spawn_blocking(move || state.point_count())
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    Ok(Json(HealthResponse { status: "ok", points }))
}
