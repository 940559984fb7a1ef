//! Upstream geocoding and routing response DTOs.
//!
//! These types map directly to the JSON returned by Nominatim, the Google
//! Geocoding API and OSRM. Only the fields we read are modelled; everything
//! else is ignored by serde.

use serde::Deserialize;

/// One result from Nominatim `/search?format=json`.
///
/// Nominatim encodes coordinates as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    pub display_name: Option<String>,
}

/// Response from the Google Geocoding API.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleGeocodeResponse {
    /// "OK", "ZERO_RESULTS", "OVER_QUERY_LIMIT", "REQUEST_DENIED", ...
    pub status: String,

    #[serde(default)]
    pub results: Vec<GoogleGeocodeResult>,

    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleGeocodeResult {
    pub geometry: GoogleGeometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleGeometry {
    pub location: GoogleLatLng,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GoogleLatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Response from OSRM `/route/v1/driving/...?geometries=geojson`.
#[derive(Debug, Clone, Deserialize)]
pub struct OsrmRouteResponse {
    /// "Ok" on success, otherwise an error code such as "NoRoute".
    pub code: String,

    pub message: Option<String>,

    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsrmRoute {
    /// Driving distance in meters.
    pub distance: f64,

    /// Expected travel time in seconds.
    pub duration: Option<f64>,

    pub geometry: OsrmGeometry,
}

/// GeoJSON LineString. Coordinates are `[lng, lat]` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct OsrmGeometry {
    pub coordinates: Vec<[f64; 2]>,
}
