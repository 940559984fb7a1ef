//! Greedy refuelling stop selection with a preferred window.
//!
//! From the current position the vehicle can reach some stretch of road.
//! Stopping very early wastes range and stopping at the last moment leaves no
//! choice, so we prefer the cheapest station between 60% and 90% of range
//! ahead (the window), and fall back to the cheapest reachable station when
//! the window is empty. Each stop refills the tank to capacity.
//!
//! This is a bounded-time heuristic, not an exact optimum over all stop
//! sequences.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::StationId;

use super::candidate::{Candidate, FuelStop};
use super::config::{InvalidVehicle, PlannerConfig, VehicleProfile};

/// Errors from stop selection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectError {
    /// No station is reachable before the tank runs dry
    #[error(
        "route infeasible: no fuel station reachable from mile {position_miles:.1} \
         (range ends at mile {max_reach_miles:.1})"
    )]
    RouteInfeasible {
        position_miles: f64,
        max_reach_miles: f64,
    },

    #[error(transparent)]
    InvalidVehicle(#[from] InvalidVehicle),
}

/// Where the vehicle is and how much fuel it carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankState {
    pub distance_miles: f64,
    pub fuel_units: f64,
}

impl TankState {
    /// At the start with a full tank.
    pub fn start(vehicle: &VehicleProfile) -> Self {
        Self {
            distance_miles: 0.0,
            fuel_units: vehicle.tank_capacity_units,
        }
    }

    /// Furthest along-route distance reachable without refuelling.
    pub fn max_reach(&self, vehicle: &VehicleProfile) -> f64 {
        self.distance_miles + (self.fuel_units / vehicle.units_per_mile).min(vehicle.range_miles)
    }
}

/// Decide the next stop from `state`.
///
/// Returns `Ok(None)` when the destination is within reach. Candidates may be
/// in any order; the choice depends only on their contents.
pub fn next_stop<'a>(
    candidates: &'a [Candidate],
    state: TankState,
    total_distance_miles: f64,
    vehicle: &VehicleProfile,
    config: &PlannerConfig,
    selected: &HashSet<StationId>,
) -> Result<Option<&'a Candidate>, SelectError> {
    let max_reach = state.max_reach(vehicle);
    if max_reach >= total_distance_miles {
        return Ok(None);
    }

    let reachable = || {
        candidates.iter().filter(move |c| {
            c.distance_from_start_miles > state.distance_miles
                && c.distance_from_start_miles <= max_reach
                && !selected.contains(&c.id())
        })
    };

    let window_start = state.distance_miles + config.window_start_fraction * vehicle.range_miles;
    let window_end = state.distance_miles + config.window_end_fraction * vehicle.range_miles;

    let in_window = reachable()
        .filter(|c| (window_start..=window_end).contains(&c.distance_from_start_miles))
        .min_by(|a, b| a.preference(b));

    match in_window.or_else(|| reachable().min_by(|a, b| a.preference(b))) {
        Some(choice) => Ok(Some(choice)),
        None => Err(SelectError::RouteInfeasible {
            position_miles: state.distance_miles,
            max_reach_miles: max_reach,
        }),
    }
}

/// Plan every stop needed to cover `total_distance_miles`.
pub fn select_stops(
    candidates: &[Candidate],
    total_distance_miles: f64,
    vehicle: &VehicleProfile,
    config: &PlannerConfig,
) -> Result<Vec<FuelStop>, SelectError> {
    vehicle.validate()?;

    let mut ordered = candidates.to_vec();
    ordered.sort_by(Candidate::route_order);

    let mut state = TankState::start(vehicle);
    let mut selected = HashSet::new();
    let mut stops: Vec<FuelStop> = Vec::new();

    while let Some(choice) = next_stop(
        &ordered,
        state,
        total_distance_miles,
        vehicle,
        config,
        &selected,
    )? {
        let travelled = choice.distance_from_start_miles - state.distance_miles;
        let remaining = (state.fuel_units - travelled * vehicle.units_per_mile).max(0.0);
        let purchased = (vehicle.tank_capacity_units - remaining).max(0.0);
        let cost = purchased * choice.price();

        debug!(
            station = %choice.id(),
            mile = choice.distance_from_start_miles,
            price = choice.price(),
            purchased,
            "selected fuel stop"
        );

        stops.push(FuelStop {
            candidate: choice.clone(),
            fuel_purchased_units: purchased,
            cost,
            segment_index: stops.len(),
            distance_from_previous_stop_miles: travelled,
        });
        selected.insert(choice.id());
        state = TankState {
            distance_miles: choice.distance_from_start_miles,
            fuel_units: vehicle.tank_capacity_units,
        };
    }

    Ok(stops)
}

#[cfg(test)]
#[path = "select_tests.rs"]
mod tests;
