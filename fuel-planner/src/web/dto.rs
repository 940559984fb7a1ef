//! Data transfer objects for web requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Location, Station};
use crate::optimizer::OptimizationResult;
use crate::planner::FuelStop;

/// Longest accepted location text.
pub const MAX_LOCATION_LEN: usize = 255;

/// Request body for `POST /api/optimize-route`.
///
/// Fields are optional so missing ones produce our own validation message.
#[derive(Debug, Default, Deserialize)]
pub struct OptimizeRouteRequest {
    /// Start location (city, state or address in the USA)
    pub start: Option<String>,

    /// Finish location
    pub finish: Option<String>,

    /// Overrides for the default vehicle
    pub vehicle: Option<VehicleOverrides>,
}

/// Per-request vehicle parameters. Anything omitted keeps the default.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct VehicleOverrides {
    pub range_miles: Option<f64>,
    pub mpg: Option<f64>,
    pub tank_capacity_units: Option<f64>,
}

/// Query string for `GET /api/stations`.
#[derive(Debug, Default, Deserialize)]
pub struct StationListQuery {
    pub state: Option<String>,
    pub city: Option<String>,
    pub max_price: Option<f64>,
    pub limit: Option<usize>,
}

/// Response for `GET /api/stations`.
#[derive(Debug, Serialize)]
pub struct StationListResponse {
    pub count: usize,
    pub stations: Vec<StationResult>,
}

/// A station in listings.
#[derive(Debug, Serialize)]
pub struct StationResult {
    pub id: u64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub lat: f64,
    pub lng: f64,
    pub price_per_unit: f64,
}

impl From<&Station> for StationResult {
    fn from(s: &Station) -> Self {
        Self {
            id: s.id.0,
            name: s.locality.name.clone(),
            address: s.locality.address.clone(),
            city: s.locality.city.clone(),
            state: s.locality.state.clone(),
            lat: s.position.lat(),
            lng: s.position.lng(),
            price_per_unit: s.price_per_unit(),
        }
    }
}

/// Response for `GET /api/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub stations: usize,
    pub route_cache_entries: u64,
    pub backend: &'static str,
}

/// A resolved endpoint.
#[derive(Debug, Serialize)]
pub struct LocationResult {
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

impl From<&Location> for LocationResult {
    fn from(l: &Location) -> Self {
        Self {
            address: l.query.clone(),
            lat: l.position.lat(),
            lng: l.position.lng(),
        }
    }
}

/// A fuel stop in the optimization response.
#[derive(Debug, Serialize)]
pub struct FuelStopResult {
    pub station: StationResult,
    pub distance_from_start: f64,
    pub distance_from_previous: f64,
    pub fuel_purchased: f64,
    pub cost: f64,
    /// 0-based position among the stops
    pub segment_index: usize,
}

impl From<&FuelStop> for FuelStopResult {
    fn from(stop: &FuelStop) -> Self {
        Self {
            station: StationResult::from(&stop.candidate.station),
            distance_from_start: round2(stop.distance_from_start_miles()),
            distance_from_previous: round2(stop.distance_from_previous_stop_miles),
            fuel_purchased: round2(stop.fuel_purchased_units),
            cost: round2(stop.cost),
            segment_index: stop.segment_index,
        }
    }
}

/// Response for `POST /api/optimize-route`.
#[derive(Debug, Serialize)]
pub struct OptimizeRouteResponse {
    pub start_location: LocationResult,
    pub finish_location: LocationResult,
    pub total_distance: f64,
    pub total_fuel_needed: f64,
    pub fuel_stops: Vec<FuelStopResult>,
    pub num_fuel_stops: usize,
    pub total_fuel_cost: f64,
    pub purchased_fuel: f64,
    pub purchased_fuel_cost: f64,
    /// `[lat, lng]` pairs from start to finish
    pub route_polyline: Vec<[f64; 2]>,
    pub route_source: String,
    pub candidates_considered: usize,
    pub map_api_calls: u32,
    pub route_cache_hit: bool,
    pub used_fallback: bool,
    /// Seconds
    pub computation_time: f64,
    pub computed_at: DateTime<Utc>,
}

impl From<&OptimizationResult> for OptimizeRouteResponse {
    fn from(r: &OptimizationResult) -> Self {
        Self {
            start_location: LocationResult::from(&r.route.start),
            finish_location: LocationResult::from(&r.route.finish),
            total_distance: round2(r.route.total_distance_miles),
            total_fuel_needed: round2(r.total_fuel_units),
            fuel_stops: r.stops.iter().map(FuelStopResult::from).collect(),
            num_fuel_stops: r.stops.len(),
            total_fuel_cost: round2(r.total_fuel_cost),
            purchased_fuel: round2(r.purchased_fuel_units),
            purchased_fuel_cost: round2(r.purchased_fuel_cost),
            route_polyline: r.route.points.iter().map(|p| [p.lat(), p.lng()]).collect(),
            route_source: r.route.source.to_string(),
            candidates_considered: r.candidates_considered,
            map_api_calls: r.external_calls,
            route_cache_hit: r.route_cache_hit,
            used_fallback: r.used_fallback,
            computation_time: r.computation_time_ms.round() / 1000.0,
            computed_at: r.computed_at,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
