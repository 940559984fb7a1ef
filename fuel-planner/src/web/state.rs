//! Application state for the web layer.

use std::sync::Arc;

use crate::optimizer::Optimizer;
use crate::planner::VehicleProfile;
use crate::stations::InMemoryStationRepository;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Route resolution, filtering and stop selection
    pub optimizer: Arc<Optimizer>,

    /// The same station set the optimizer queries, for listings
    pub stations: Arc<InMemoryStationRepository>,

    /// Vehicle used when a request does not override it
    pub default_vehicle: VehicleProfile,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        optimizer: Optimizer,
        stations: Arc<InMemoryStationRepository>,
        default_vehicle: VehicleProfile,
    ) -> Self {
        Self {
            optimizer: Arc::new(optimizer),
            stations,
            default_vehicle,
        }
    }
}
