//! Fuel station data: loading, indexing and spatial lookup.
//!
//! The planner only needs one query, "every station inside this box", which
//! is the [`StationRepository`] trait. The shipped implementation is an
//! immutable in-memory index built from an OPIS CSV export at startup, with
//! stations that lack coordinates geocoded on the way in.

mod dataset;
mod error;
mod locate;
mod memory;

pub use dataset::{
    LoadSummary, StationRecords, UnlocatedStation, load_stations_csv, read_stations,
};
pub use error::StationError;
pub use locate::{GEOCODE_CONCURRENCY, locate_stations};
pub use memory::{DEFAULT_LIST_LIMIT, InMemoryStationRepository, MAX_LIST_LIMIT, StationFilter};

use crate::domain::Station;
use crate::geo::BoundingBox;

/// Read-only spatial lookup over the station set.
pub trait StationRepository: Send + Sync {
    /// All stations whose position lies inside `bbox` (edges included).
    fn stations_in_bounding_box(&self, bbox: &BoundingBox) -> Result<Vec<Station>, StationError>;

    /// Number of stations available, for health reporting.
    fn station_count(&self) -> usize;
}
