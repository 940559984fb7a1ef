//! Deterministic route backend for development and tests.
//!
//! Synthesizes coordinates and straight-line routes from a hash of the
//! location text, so the same inputs always give the same geometry without
//! any network access. "City, ST" inputs land near the state's center.

use sha2::{Digest, Sha256};

use crate::domain::{Coordinate, Location, RouteGeometry, RouteSource};
use crate::geo::polyline_length_miles;

use super::error::RouteError;

/// Segments in every synthesized route.
pub const OFFLINE_SEGMENTS: usize = 10;

/// Maximum offset from the state center, in degrees on each axis.
const JITTER_DEGREES: f64 = 2.0;

/// Geographic center of the contiguous US, used for unknown states.
const US_CENTER: (f64, f64) = (39.8, -98.5);

/// Approximate state centers.
const STATE_CENTERS: &[(&str, f64, f64)] = &[
    ("AL", 32.8, -86.8),
    ("AR", 34.9, -92.4),
    ("AZ", 34.3, -111.7),
    ("CA", 36.7, -119.4),
    ("CO", 39.0, -105.5),
    ("CT", 41.6, -72.7),
    ("DE", 39.0, -75.5),
    ("FL", 28.6, -82.4),
    ("GA", 32.7, -83.4),
    ("IA", 41.8, -93.2),
    ("ID", 44.4, -114.6),
    ("IL", 40.6, -89.3),
    ("IN", 39.9, -86.3),
    ("KS", 38.5, -98.4),
    ("KY", 37.5, -85.3),
    ("LA", 31.1, -92.0),
    ("MA", 42.3, -71.8),
    ("MD", 39.0, -76.8),
    ("ME", 45.4, -69.2),
    ("MI", 44.3, -85.4),
    ("MN", 46.3, -94.3),
    ("MO", 38.4, -92.5),
    ("MS", 32.7, -89.7),
    ("MT", 47.0, -109.6),
    ("NC", 35.6, -79.4),
    ("ND", 47.5, -100.5),
    ("NE", 41.1, -98.2),
    ("NH", 43.7, -71.6),
    ("NJ", 40.0, -74.4),
    ("NM", 34.4, -106.1),
    ("NV", 38.8, -116.4),
    ("NY", 40.7, -74.0),
    ("OH", 40.4, -82.9),
    ("OK", 35.6, -97.5),
    ("OR", 43.9, -120.6),
    ("PA", 41.2, -77.1),
    ("RI", 41.7, -71.5),
    ("SC", 33.9, -80.9),
    ("SD", 44.4, -100.2),
    ("TN", 35.9, -86.4),
    ("TX", 31.5, -99.3),
    ("UT", 39.3, -111.0),
    ("VA", 37.5, -78.9),
    ("VT", 44.1, -72.7),
    ("WA", 47.4, -120.5),
    ("WI", 44.6, -89.9),
    ("WV", 38.6, -80.6),
    ("WY", 42.7, -107.3),
];

/// Offline backend. Stateless; every call is a pure function of its input.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRouteBackend;

impl OfflineRouteBackend {
    pub fn new() -> Self {
        Self
    }

    /// Map location text to a stable coordinate.
    pub fn geocode(&self, query: &str) -> Result<Coordinate, RouteError> {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return Err(RouteError::LocationNotFound(query.to_string()));
        }

        let (base_lat, base_lng) = state_code(&normalized)
            .and_then(state_center)
            .unwrap_or(US_CENTER);

        let digest = Sha256::digest(normalized.as_bytes());
        let lat = base_lat + jitter(&digest[0..8]);
        let lng = base_lng + jitter(&digest[8..16]);

        Coordinate::new(lat, lng).map_err(|e| RouteError::invalid("offline", e.to_string()))
    }

    /// Straight route between the endpoints, split into equal segments.
    pub fn route(&self, start: &Location, finish: &Location) -> Result<RouteGeometry, RouteError> {
        let points: Vec<Coordinate> = (0..=OFFLINE_SEGMENTS)
            .map(|i| {
                start
                    .position
                    .lerp(&finish.position, i as f64 / OFFLINE_SEGMENTS as f64)
            })
            .collect();

        let distance = polyline_length_miles(&points);
        if distance <= 0.0 {
            return Err(RouteError::LocationNotFound(format!(
                "{} and {} resolve to the same place",
                start.query, finish.query
            )));
        }

        RouteGeometry::new(
            points,
            distance,
            start.clone(),
            finish.clone(),
            RouteSource::Offline,
        )
        .map_err(|e| RouteError::invalid("offline", e.to_string()))
    }
}

/// Lowercase and collapse whitespace.
fn normalize(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Two-letter state code after the last comma, if any ("reno, nv 89501" -> "NV").
fn state_code(normalized: &str) -> Option<String> {
    let (_, tail) = normalized.rsplit_once(',')?;
    let code = tail.split_whitespace().next()?;
    (code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| code.to_ascii_uppercase())
}

fn state_center(code: String) -> Option<(f64, f64)> {
    STATE_CENTERS
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|&(_, lat, lng)| (lat, lng))
}

/// Map 8 hash bytes to an offset in `[-JITTER_DEGREES, JITTER_DEGREES]`.
fn jitter(bytes: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    let unit = u64::from_be_bytes(buf) as f64 / u64::MAX as f64;
    (unit * 2.0 - 1.0) * JITTER_DEGREES
}
