//! HTTP route handlers.

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::{error, warn};

use crate::cache::normalize_location;
use crate::optimizer::{OptimizeError, OptimizeRequest};
use crate::planner::{SelectError, VehicleProfile};
use crate::routing::RouteError;
use crate::stations::StationFilter;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/stations", get(list_stations))
        .route("/api/optimize-route", post(optimize_route))
        .with_state(state)
}

/// Health check endpoint.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let routes = state.optimizer.routes();
    Json(HealthResponse {
        status: "ok",
        stations: state.stations.len(),
        route_cache_entries: routes.cache().route_count(),
        backend: if routes.backend().is_live() {
            "live"
        } else {
            "offline"
        },
    })
}

/// List stations, cheapest first.
async fn list_stations(
    State(state): State<AppState>,
    query: Result<Query<StationListQuery>, QueryRejection>,
) -> Result<Json<StationListResponse>, AppError> {
    let Query(req) = query.map_err(|e| AppError::BadRequest {
        message: e.body_text(),
    })?;

    let filter = StationFilter {
        state: req.state,
        city: req.city,
        max_price: req.max_price,
        limit: req.limit,
    };
    let stations: Vec<StationResult> = state
        .stations
        .list(&filter)
        .iter()
        .map(StationResult::from)
        .collect();

    Ok(Json(StationListResponse {
        count: stations.len(),
        stations,
    }))
}

/// Plan fuel stops between two locations.
async fn optimize_route(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<OptimizeRouteResponse>, AppError> {
    // Parse JSON manually so malformed bodies get our error shape
    let req: OptimizeRouteRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "rejected optimize-route body");
        AppError::BadRequest {
            message: format!("Invalid JSON: {e}"),
        }
    })?;

    let start = validate_location("start", req.start.as_deref())?;
    let finish = validate_location("finish", req.finish.as_deref())?;
    if normalize_location(&start) == normalize_location(&finish) {
        return Err(AppError::BadRequest {
            message: "start and finish locations must be different".to_string(),
        });
    }

    let vehicle = match req.vehicle {
        Some(overrides) => apply_overrides(state.default_vehicle, overrides)?,
        None => state.default_vehicle,
    };

    let request = OptimizeRequest::new(start, finish).with_vehicle(vehicle);
    let result = state.optimizer.optimize(&request).await?;

    Ok(Json(OptimizeRouteResponse::from(&result)))
}

/// Trimmed location text, or why it is unusable.
fn validate_location(field: &str, value: Option<&str>) -> Result<String, AppError> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest {
            message: format!("{field} location is required"),
        });
    }
    if trimmed.chars().count() > MAX_LOCATION_LEN {
        return Err(AppError::BadRequest {
            message: format!("{field} location must be at most {MAX_LOCATION_LEN} characters"),
        });
    }
    Ok(trimmed.to_string())
}

/// Apply per-request overrides on top of the default vehicle.
///
/// Without an explicit tank size the tank holds exactly one range of fuel.
fn apply_overrides(
    default: VehicleProfile,
    overrides: VehicleOverrides,
) -> Result<VehicleProfile, AppError> {
    for (field, value) in [
        ("range_miles", overrides.range_miles),
        ("mpg", overrides.mpg),
        ("tank_capacity_units", overrides.tank_capacity_units),
    ] {
        if let Some(v) = value
            && !(v.is_finite() && v > 0.0)
        {
            return Err(AppError::BadRequest {
                message: format!("vehicle {field} must be positive, got {v}"),
            });
        }
    }

    let range = overrides.range_miles.unwrap_or(default.range_miles);
    let mpg = overrides.mpg.unwrap_or(default.mpg());
    let mut vehicle = VehicleProfile::from_mpg(range, mpg).map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })?;
    if let Some(tank) = overrides.tank_capacity_units {
        vehicle.tank_capacity_units = tank;
    }
    Ok(vehicle)
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Unprocessable { message: String },
    TooManyRequests { message: String },
    BadGateway { message: String },
    GatewayTimeout { message: String },
    Internal { message: String },
}

impl From<OptimizeError> for AppError {
    fn from(e: OptimizeError) -> Self {
        let message = e.to_string();
        match e {
            OptimizeError::Route(RouteError::LocationNotFound(_)) => AppError::NotFound { message },
            OptimizeError::Route(RouteError::RateLimited { .. }) => {
                AppError::TooManyRequests { message }
            }
            OptimizeError::Route(
                RouteError::UpstreamUnavailable { .. } | RouteError::InvalidResponse { .. },
            ) => AppError::BadGateway { message },
            OptimizeError::Select(SelectError::RouteInfeasible { .. }) => {
                AppError::Unprocessable { message }
            }
            OptimizeError::Select(SelectError::InvalidVehicle(_))
            | OptimizeError::InvalidVehicle(_) => AppError::BadRequest { message },
            OptimizeError::DeadlineExceeded(_) => AppError::GatewayTimeout { message },
            OptimizeError::Route(RouteError::Client(_)) | OptimizeError::Stations(_) => {
                AppError::Internal { message }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Unprocessable { message } => (StatusCode::UNPROCESSABLE_ENTITY, message),
            AppError::TooManyRequests { message } => (StatusCode::TOO_MANY_REQUESTS, message),
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message),
            AppError::GatewayTimeout { message } => (StatusCode::GATEWAY_TIMEOUT, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
