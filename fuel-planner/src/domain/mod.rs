//! Domain types for the fuel route planner.
//!
//! This module contains the core value types shared by the route provider,
//! the station repository and the planner. All types enforce their invariants
//! at construction time, so code that receives these types can trust their
//! validity.

mod coordinate;
mod route;
mod station;

pub use coordinate::{Coordinate, InvalidCoordinate};
pub use route::{GeometryError, Location, RouteGeometry, RouteSource};
pub use station::{InvalidPrice, Locality, Station, StationId, check_price};
