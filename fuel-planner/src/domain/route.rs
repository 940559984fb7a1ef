//! Route geometry produced by the route provider.

use std::fmt;

use serde::Serialize;

use super::Coordinate;

/// Errors constructing a route geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// A polyline needs at least one segment
    #[error("route must have at least 2 points, got {0}")]
    TooFewPoints(usize),

    /// Total distance must be a positive number of miles
    #[error("route distance must be positive and finite, got {0}")]
    InvalidDistance(f64),
}

/// Which backend produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSource {
    /// Live geocoding + OSRM routing.
    Osrm,
    /// Deterministic geometry synthesized without network access.
    Offline,
}

impl fmt::Display for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteSource::Osrm => f.write_str("osrm"),
            RouteSource::Offline => f.write_str("offline"),
        }
    }
}

/// A resolved trip endpoint: the text the caller gave plus where it landed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub query: String,
    pub position: Coordinate,
}

impl Location {
    pub fn new(query: impl Into<String>, position: Coordinate) -> Self {
        Self {
            query: query.into(),
            position,
        }
    }
}

/// Ordered polyline from start to finish with its driving distance.
///
/// Immutable once built; the provider hands it out behind an `Arc` so the
/// cache and in-flight requests share one copy.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    points: Vec<Coordinate>,
    total_distance_miles: f64,
    start: Location,
    finish: Location,
    source: RouteSource,
}

impl RouteGeometry {
    /// Build a geometry, checking the polyline and distance invariants.
    pub fn new(
        points: Vec<Coordinate>,
        total_distance_miles: f64,
        start: Location,
        finish: Location,
        source: RouteSource,
    ) -> Result<Self, GeometryError> {
        if points.len() < 2 {
            return Err(GeometryError::TooFewPoints(points.len()));
        }

        if !total_distance_miles.is_finite() || total_distance_miles <= 0.0 {
            return Err(GeometryError::InvalidDistance(total_distance_miles));
        }

        Ok(Self {
            points,
            total_distance_miles,
            start,
            finish,
            source,
        })
    }

    /// Polyline vertices, first to last.
    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    /// Driving distance reported for the route.
    pub fn total_distance_miles(&self) -> f64 {
        self.total_distance_miles
    }

    pub fn start(&self) -> &Location {
        &self.start
    }

    pub fn finish(&self) -> &Location {
        &self.finish
    }

    pub fn source(&self) -> RouteSource {
        self.source
    }

    /// Number of polyline segments (always at least 1).
    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }
}
