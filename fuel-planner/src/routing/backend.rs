//! Backend selection for route resolution.

use crate::domain::{Coordinate, Location, RouteGeometry, RouteSource};

use super::client::LiveRouteClient;
use super::error::RouteError;
use super::offline::OfflineRouteBackend;

/// Where geocodes and routes come from.
#[derive(Debug, Clone)]
pub enum RouteBackend {
    /// Geocoding service plus OSRM over HTTP.
    Live(LiveRouteClient),
    /// Deterministic geometry, no network.
    Offline(OfflineRouteBackend),
}

impl RouteBackend {
    /// Resolve one location string. Single attempt; callers retry.
    pub async fn geocode(&self, query: &str) -> Result<Coordinate, RouteError> {
        match self {
            RouteBackend::Live(client) => client.geocode(query).await,
            RouteBackend::Offline(backend) => backend.geocode(query),
        }
    }

    /// Route between two resolved endpoints. Single attempt; callers retry.
    pub async fn route(
        &self,
        start: &Location,
        finish: &Location,
    ) -> Result<RouteGeometry, RouteError> {
        match self {
            RouteBackend::Live(client) => client.route(start, finish).await,
            RouteBackend::Offline(backend) => backend.route(start, finish),
        }
    }

    pub fn source(&self) -> RouteSource {
        match self {
            RouteBackend::Live(_) => RouteSource::Osrm,
            RouteBackend::Offline(_) => RouteSource::Offline,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, RouteBackend::Live(_))
    }
}
