//! Web layer for the fuel route planner.
//!
//! Provides HTTP endpoints for planning fuel stops and browsing stations.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
