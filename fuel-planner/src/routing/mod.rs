//! Geocoding and routing backends.
//!
//! Turns a pair of location strings into route geometry. Two backends exist:
//! the live one calls a geocoder (Google or Nominatim) and OSRM over HTTP,
//! the offline one synthesizes stable geometry from the input text.
//!
//! Backends make single attempts. Retry with backoff is in [`retry`] and
//! caching is in [`crate::cache`].

mod backend;
mod client;
mod convert;
mod error;
mod offline;
pub mod retry;
mod types;

pub use backend::RouteBackend;
pub use client::{
    DEFAULT_GOOGLE_URL, DEFAULT_NOMINATIM_URL, DEFAULT_OSRM_URL, LiveConfig, LiveRouteClient,
};
pub use convert::METERS_PER_MILE;
pub use error::RouteError;
pub use offline::{OFFLINE_SEGMENTS, OfflineRouteBackend};
pub use retry::RetryPolicy;
