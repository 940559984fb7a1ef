//! Fuel station types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Error returned when a station price is not a usable unit price.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid price {0}: must be finite and non-negative")]
pub struct InvalidPrice(pub f64);

/// Unique station identifier (the OPIS truck stop ID in the source dataset).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub u64);

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display-only metadata about where a station is.
///
/// Never consulted by the planning algorithm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    pub name: String,
    pub address: String,
    pub city: String,
    /// Two-letter state code, upper case.
    pub state: String,
}

/// A geolocated fuel station with a unit price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub id: StationId,
    pub position: Coordinate,
    price_per_unit: f64,
    pub locality: Locality,
}

impl Station {
    /// Create a station, validating the price.
    pub fn new(
        id: StationId,
        position: Coordinate,
        price_per_unit: f64,
        locality: Locality,
    ) -> Result<Self, InvalidPrice> {
        check_price(price_per_unit)?;

        Ok(Self {
            id,
            position,
            price_per_unit,
            locality,
        })
    }

    /// Price per unit of fuel.
    pub fn price_per_unit(&self) -> f64 {
        self.price_per_unit
    }
}

/// Reject prices a [`Station`] cannot hold.
pub fn check_price(price_per_unit: f64) -> Result<(), InvalidPrice> {
    if !price_per_unit.is_finite() || price_per_unit < 0.0 {
        return Err(InvalidPrice(price_per_unit));
    }
    Ok(())
}
