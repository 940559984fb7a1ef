//! Conversion from upstream DTOs to domain types.

use crate::domain::{Coordinate, Location, RouteGeometry, RouteSource};

use super::error::RouteError;
use super::types::{GoogleGeocodeResponse, NominatimPlace, OsrmRouteResponse};

/// Meters in a statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// Take the best Nominatim match for `query`.
pub fn nominatim_to_coordinate(
    places: &[NominatimPlace],
    query: &str,
) -> Result<Coordinate, RouteError> {
    let place = places
        .first()
        .ok_or_else(|| RouteError::LocationNotFound(query.to_string()))?;

    let lat: f64 = place
        .lat
        .parse()
        .map_err(|_| RouteError::invalid("nominatim", format!("bad latitude {:?}", place.lat)))?;
    let lng: f64 = place
        .lon
        .parse()
        .map_err(|_| RouteError::invalid("nominatim", format!("bad longitude {:?}", place.lon)))?;

    Coordinate::new(lat, lng).map_err(|e| RouteError::invalid("nominatim", e.to_string()))
}

/// Interpret a Google Geocoding response for `query`.
pub fn google_to_coordinate(
    response: &GoogleGeocodeResponse,
    query: &str,
) -> Result<Coordinate, RouteError> {
    match response.status.as_str() {
        "OK" => {
            let location = response
                .results
                .first()
                .map(|r| r.geometry.location)
                .ok_or_else(|| RouteError::LocationNotFound(query.to_string()))?;
            Coordinate::new(location.lat, location.lng)
                .map_err(|e| RouteError::invalid("google", e.to_string()))
        }
        "ZERO_RESULTS" => Err(RouteError::LocationNotFound(query.to_string())),
        "OVER_QUERY_LIMIT" => Err(RouteError::RateLimited { service: "google" }),
        "UNKNOWN_ERROR" => Err(RouteError::unavailable("google", "UNKNOWN_ERROR")),
        other => Err(RouteError::invalid(
            "google",
            format!(
                "{other}: {}",
                response.error_message.as_deref().unwrap_or("no message")
            ),
        )),
    }
}

/// Build route geometry from an OSRM route response.
pub fn osrm_to_geometry(
    response: &OsrmRouteResponse,
    start: Location,
    finish: Location,
) -> Result<RouteGeometry, RouteError> {
    match response.code.as_str() {
        "Ok" => {}
        // No road near one of the endpoints, or no road between them.
        "NoRoute" | "NoSegment" => {
            return Err(RouteError::LocationNotFound(format!(
                "no drivable route from {} to {}",
                start.query, finish.query
            )));
        }
        other => {
            return Err(RouteError::invalid(
                "osrm",
                format!(
                    "{other}: {}",
                    response.message.as_deref().unwrap_or("no message")
                ),
            ));
        }
    }

    let route = response
        .routes
        .first()
        .ok_or_else(|| RouteError::invalid("osrm", "response contained no routes"))?;

    let points = route
        .geometry
        .coordinates
        .iter()
        .map(|[lng, lat]| Coordinate::new(*lat, *lng))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RouteError::invalid("osrm", e.to_string()))?;

    let distance_miles = route.distance / METERS_PER_MILE;

    RouteGeometry::new(points, distance_miles, start, finish, RouteSource::Osrm)
        .map_err(|e| RouteError::invalid("osrm", e.to_string()))
}
