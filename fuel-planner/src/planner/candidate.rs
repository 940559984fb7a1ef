//! Stations annotated with their position relative to a route.

use std::cmp::Ordering;

use serde::Serialize;

use crate::domain::{Station, StationId};

/// A station inside the route corridor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub station: Station,

    /// Along-route distance from the start to the station's projection.
    pub distance_from_start_miles: f64,

    /// Distance from the station to the route. Never exceeds the corridor width.
    pub corridor_offset_miles: f64,

    /// Route polyline segment the station projects onto.
    pub route_segment: usize,
}

impl Candidate {
    pub fn id(&self) -> StationId {
        self.station.id
    }

    pub fn price(&self) -> f64 {
        self.station.price_per_unit()
    }

    /// Along-route order: distance, then cheaper first, then lower id.
    pub fn route_order(&self, other: &Candidate) -> Ordering {
        self.distance_from_start_miles
            .total_cmp(&other.distance_from_start_miles)
            .then(self.price().total_cmp(&other.price()))
            .then(self.id().cmp(&other.id()))
    }

    /// Preference when choosing a stop: cheaper, then nearer, then lower id.
    pub fn preference(&self, other: &Candidate) -> Ordering {
        self.price()
            .total_cmp(&other.price())
            .then(
                self.distance_from_start_miles
                    .total_cmp(&other.distance_from_start_miles),
            )
            .then(self.id().cmp(&other.id()))
    }
}

/// A chosen refuelling stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuelStop {
    pub candidate: Candidate,

    /// Fuel bought here to refill the tank.
    pub fuel_purchased_units: f64,

    /// `fuel_purchased_units × price`.
    pub cost: f64,

    /// 0-based rank among the selected stops.
    pub segment_index: usize,

    /// Miles since the previous stop, or since the start for the first stop.
    pub distance_from_previous_stop_miles: f64,
}

impl FuelStop {
    pub fn distance_from_start_miles(&self) -> f64 {
        self.candidate.distance_from_start_miles
    }
}
