//! In-memory station index.

use std::path::Path;

use crate::cache::CachedRouteProvider;
use crate::domain::Station;
use crate::geo::BoundingBox;

use super::StationRepository;
use super::dataset::{LoadSummary, load_stations_csv};
use super::error::StationError;
use super::locate::locate_stations;

/// Listing size when the caller gives no limit.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Hard cap on listing size.
pub const MAX_LIST_LIMIT: usize = 500;

/// Criteria for [`InMemoryStationRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct StationFilter {
    /// Two-letter state code, any case.
    pub state: Option<String>,
    /// Case-insensitive substring of the city name.
    pub city: Option<String>,
    pub max_price: Option<f64>,
    pub limit: Option<usize>,
}

/// Immutable station set sorted by latitude.
///
/// Bounding box queries binary-search the latitude band and scan it for
/// longitude, which keeps corridor lookups cheap on the full national set.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStationRepository {
    stations: Vec<Station>,
}

impl InMemoryStationRepository {
    pub fn new(mut stations: Vec<Station>) -> Self {
        stations.sort_by(|a, b| {
            a.position
                .lat()
                .total_cmp(&b.position.lat())
                .then(a.id.cmp(&b.id))
        });
        Self { stations }
    }

    /// Load a CSV dataset, geocode rows without coordinates, and index it.
    pub async fn load(
        path: &Path,
        geocoder: &CachedRouteProvider,
    ) -> Result<(Self, LoadSummary), StationError> {
        let records = load_stations_csv(path)?;
        let (stations, summary) = locate_stations(records, geocoder).await;
        Ok((Self::new(stations), summary))
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations matching `filter`, cheapest first.
    pub fn list(&self, filter: &StationFilter) -> Vec<Station> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .min(MAX_LIST_LIMIT);
        let city = filter.city.as_deref().map(str::to_lowercase);

        let mut matches: Vec<&Station> = self
            .stations
            .iter()
            .filter(|s| {
                filter
                    .state
                    .as_deref()
                    .is_none_or(|state| s.locality.state.eq_ignore_ascii_case(state))
            })
            .filter(|s| {
                city.as_deref()
                    .is_none_or(|city| s.locality.city.to_lowercase().contains(city))
            })
            .filter(|s| filter.max_price.is_none_or(|max| s.price_per_unit() <= max))
            .collect();

        matches.sort_by(|a, b| {
            a.price_per_unit()
                .total_cmp(&b.price_per_unit())
                .then(a.id.cmp(&b.id))
        });
        matches.into_iter().take(limit).cloned().collect()
    }
}

impl StationRepository for InMemoryStationRepository {
    fn stations_in_bounding_box(&self, bbox: &BoundingBox) -> Result<Vec<Station>, StationError> {
        let first = self
            .stations
            .partition_point(|s| s.position.lat() < bbox.min_lat);

        Ok(self.stations[first..]
            .iter()
            .take_while(|s| s.position.lat() <= bbox.max_lat)
            .filter(|s| bbox.contains(&s.position))
            .cloned()
            .collect())
    }

    fn station_count(&self) -> usize {
        self.len()
    }
}
