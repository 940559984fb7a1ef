//! Vehicle and planner parameters.

use serde::Serialize;

/// Vehicle parameters rejected by validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid vehicle: {field} must be positive and finite, got {value}")]
pub struct InvalidVehicle {
    pub field: &'static str,
    pub value: f64,
}

/// The vehicle being planned for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleProfile {
    /// Distance the vehicle can cover on a full tank.
    pub range_miles: f64,

    /// Fuel burned per mile (1 / mpg).
    pub units_per_mile: f64,

    pub tank_capacity_units: f64,
}

impl VehicleProfile {
    /// Build a profile from range and fuel economy; the tank holds exactly
    /// one range worth of fuel.
    pub fn from_mpg(range_miles: f64, mpg: f64) -> Result<Self, InvalidVehicle> {
        check("range_miles", range_miles)?;
        check("mpg", mpg)?;

        let profile = Self {
            range_miles,
            units_per_mile: 1.0 / mpg,
            tank_capacity_units: range_miles / mpg,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), InvalidVehicle> {
        check("range_miles", self.range_miles)?;
        check("units_per_mile", self.units_per_mile)?;
        check("tank_capacity_units", self.tank_capacity_units)
    }

    /// Miles per unit of fuel.
    pub fn mpg(&self) -> f64 {
        1.0 / self.units_per_mile
    }
}

impl Default for VehicleProfile {
    /// 500 mile range at 10 mpg.
    fn default() -> Self {
        Self {
            range_miles: 500.0,
            units_per_mile: 0.1,
            tank_capacity_units: 50.0,
        }
    }
}

fn check(field: &'static str, value: f64) -> Result<(), InvalidVehicle> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InvalidVehicle { field, value })
    }
}

/// Tuning for candidate filtering and stop selection.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Maximum distance from the route for a station to be considered.
    pub corridor_width_miles: f64,

    /// Start of the preferred refuel window, as a fraction of range past the
    /// current position.
    pub window_start_fraction: f64,

    /// End of the preferred refuel window.
    pub window_end_fraction: f64,
}

impl PlannerConfig {
    pub fn new(
        corridor_width_miles: f64,
        window_start_fraction: f64,
        window_end_fraction: f64,
    ) -> Self {
        Self {
            corridor_width_miles,
            window_start_fraction,
            window_end_fraction,
        }
    }

    pub fn with_corridor_width(mut self, miles: f64) -> Self {
        self.corridor_width_miles = miles;
        self
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            corridor_width_miles: 75.0,
            window_start_fraction: 0.6,
            window_end_fraction: 0.9,
        }
    }
}
