//! Refuelling planner.
//!
//! Given a route, this module answers: "where along it should the vehicle
//! stop for fuel to keep the bill low without ever running dry?"
//!
//! Planning runs in two steps. [`filter_candidates`] narrows the national
//! station set to the ones near the route and places them along it, then
//! [`select_stops`] walks the route choosing stops greedily.

mod candidate;
mod config;
mod filter;
mod select;

pub use candidate::{Candidate, FuelStop};
pub use config::{InvalidVehicle, PlannerConfig, VehicleProfile};
pub use filter::filter_candidates;
pub use select::{SelectError, TankState, next_stop, select_stops};
