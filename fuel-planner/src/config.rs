//! Process configuration from environment variables.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::planner::{PlannerConfig, VehicleProfile};
use crate::routing::{LiveConfig, RetryPolicy};

/// A variable was set to something we cannot use.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Which route backend serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Live,
    Offline,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(BackendKind::Live),
            "offline" | "mock" => Ok(BackendKind::Offline),
            other => Err(format!("expected \"live\" or \"offline\", got {other:?}")),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Live => f.write_str("live"),
            BackendKind::Offline => f.write_str("offline"),
        }
    }
}

/// Everything `main` needs to start the server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub stations_csv: PathBuf,
    pub backend: BackendKind,
    /// Retry on the offline backend when the live one is unavailable.
    pub offline_fallback: bool,
    pub live: LiveConfig,
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub deadline: Duration,
    pub planner: PlannerConfig,
    /// Used when a request does not describe its own vehicle.
    pub vehicle: VehicleProfile,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());

        let addr = parse_or(&get, "FUEL_PLANNER_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?;
        let stations_csv = get("FUEL_STATIONS_CSV")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/fuel_stations.csv"));
        let backend = parse_or(&get, "ROUTE_BACKEND", BackendKind::Live)?;
        let offline_fallback = bool_or(&get, "ROUTE_OFFLINE_FALLBACK", false)?;

        let mut live = LiveConfig::default()
            .with_timeout(parse_or(&get, "UPSTREAM_TIMEOUT_SECS", 15)?);
        if let Some(url) = get("NOMINATIM_URL") {
            live = live.with_nominatim_url(url.trim_end_matches('/'));
        }
        if let Some(url) = get("OSRM_URL") {
            live = live.with_osrm_url(url.trim_end_matches('/'));
        }
        if let Some(key) = get("GOOGLE_MAPS_API_KEY") {
            live = live.with_google_api_key(key);
        }

        let cache = CacheConfig {
            route_ttl: Duration::from_secs(parse_or(&get, "ROUTE_CACHE_TTL_SECS", 3600)?),
            geocode_ttl: Duration::from_secs(parse_or(&get, "GEOCODE_CACHE_TTL_SECS", 86_400)?),
            ..CacheConfig::default()
        };
        let retry = RetryPolicy::default().with_max_retries(parse_or(&get, "UPSTREAM_MAX_RETRIES", 2)?);
        let deadline = Duration::from_secs(parse_or(&get, "REQUEST_DEADLINE_SECS", 30)?);

        let corridor: f64 = parse_or(&get, "CORRIDOR_WIDTH_MILES", 75.0)?;
        if !(corridor.is_finite() && corridor > 0.0) {
            return Err(invalid("CORRIDOR_WIDTH_MILES", corridor, "must be positive"));
        }
        let planner = PlannerConfig::default().with_corridor_width(corridor);

        let range: f64 = parse_or(&get, "VEHICLE_RANGE_MILES", 500.0)?;
        let mpg: f64 = parse_or(&get, "VEHICLE_MPG", 10.0)?;
        let vehicle = VehicleProfile::from_mpg(range, mpg).map_err(|e| {
            let var = if e.field == "mpg" {
                "VEHICLE_MPG"
            } else {
                "VEHICLE_RANGE_MILES"
            };
            invalid(var, e.value, "must be positive")
        })?;

        Ok(Self {
            addr,
            stations_csv,
            backend,
            offline_fallback,
            live,
            cache,
            retry,
            deadline,
            planner,
            vehicle,
        })
    }
}

fn invalid(var: &'static str, value: impl ToString, reason: impl Into<String>) -> ConfigError {
    ConfigError {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T>(
    get: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(var, &raw, e.to_string())),
        None => Ok(default),
    }
}

fn bool_or(
    get: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = get(var) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, &raw, "expected true or false")),
    }
}
