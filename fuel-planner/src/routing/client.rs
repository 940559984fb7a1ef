//! Live geocoding and routing HTTP client.
//!
//! Geocodes through Google when an API key is configured and Nominatim
//! otherwise, and routes through OSRM. Each method makes exactly one HTTP
//! request; retries live in [`super::retry`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{Coordinate, Location, RouteGeometry};

use super::convert::{google_to_coordinate, nominatim_to_coordinate, osrm_to_geometry};
use super::error::RouteError;
use super::types::{GoogleGeocodeResponse, NominatimPlace, OsrmRouteResponse};

/// Public Nominatim instance.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Public OSRM demo server.
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

/// Google Geocoding API base.
pub const DEFAULT_GOOGLE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

const DEFAULT_MAX_CONCURRENT: usize = 4;

const DEFAULT_USER_AGENT: &str = concat!("fuel-planner/", env!("CARGO_PKG_VERSION"));

/// How much of an unparseable body to keep in errors.
const BODY_SNIPPET_CHARS: usize = 500;

/// Configuration for the live client.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub nominatim_url: String,
    pub osrm_url: String,
    pub google_url: String,
    /// When set, geocoding goes to Google instead of Nominatim.
    pub google_api_key: Option<String>,
    /// Nominatim's usage policy requires an identifying agent.
    pub user_agent: String,
    pub max_concurrent: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            osrm_url: DEFAULT_OSRM_URL.to_string(),
            google_url: DEFAULT_GOOGLE_URL.to_string(),
            google_api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 15,
        }
    }
}

impl LiveConfig {
    pub fn with_nominatim_url(mut self, url: impl Into<String>) -> Self {
        self.nominatim_url = url.into();
        self
    }

    pub fn with_osrm_url(mut self, url: impl Into<String>) -> Self {
        self.osrm_url = url.into();
        self
    }

    /// Set the Google endpoint (for testing).
    pub fn with_google_url(mut self, url: impl Into<String>) -> Self {
        self.google_url = url.into();
        self
    }

    pub fn with_google_api_key(mut self, key: impl Into<String>) -> Self {
        self.google_api_key = Some(key.into());
        self
    }

    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP client for the live geocoding and routing services.
///
/// Cheap to clone. A semaphore caps in-flight requests across clones.
#[derive(Debug, Clone)]
pub struct LiveRouteClient {
    http: reqwest::Client,
    config: Arc<LiveConfig>,
    semaphore: Arc<Semaphore>,
}

impl LiveRouteClient {
    pub fn new(config: LiveConfig) -> Result<Self, RouteError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(RouteError::Client)?;

        Ok(Self {
            http,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config: Arc::new(config),
        })
    }

    /// Name of the geocoder in use, for logs.
    pub fn geocoder(&self) -> &'static str {
        if self.config.google_api_key.is_some() {
            "google"
        } else {
            "nominatim"
        }
    }

    /// Resolve free-form location text to a coordinate.
    pub async fn geocode(&self, query: &str) -> Result<Coordinate, RouteError> {
        match &self.config.google_api_key {
            Some(key) => {
                let request = self
                    .http
                    .get(&self.config.google_url)
                    .query(&[("address", query), ("key", key.as_str())]);
                let response: GoogleGeocodeResponse = self.fetch("google", request).await?;
                google_to_coordinate(&response, query)
            }
            None => {
                let url = format!("{}/search", self.config.nominatim_url);
                let request = self.http.get(&url).query(&[
                    ("q", query),
                    ("format", "json"),
                    ("limit", "1"),
                    ("countrycodes", "us"),
                ]);
                let places: Vec<NominatimPlace> = self.fetch("nominatim", request).await?;
                nominatim_to_coordinate(&places, query)
            }
        }
    }

    /// Fetch the driving route between two resolved endpoints.
    pub async fn route(
        &self,
        start: &Location,
        finish: &Location,
    ) -> Result<RouteGeometry, RouteError> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.config.osrm_url,
            start.position.lng(),
            start.position.lat(),
            finish.position.lng(),
            finish.position.lat(),
        );
        let request = self
            .http
            .get(&url)
            .query(&[("overview", "full"), ("geometries", "geojson")]);

        let response: OsrmRouteResponse = self.fetch("osrm", request).await?;
        osrm_to_geometry(&response, start.clone(), finish.clone())
    }

    /// Send one request and decode its JSON body.
    ///
    /// 4xx bodies are still decoded when possible: OSRM reports `NoRoute`
    /// with a 400 and a normal payload.
    async fn fetch<T: DeserializeOwned>(
        &self,
        service: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RouteError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| RouteError::unavailable(service, "client shut down"))?;

        let response = request
            .send()
            .await
            .map_err(|e| RouteError::unavailable(service, e))?;
        let status = response.status();
        debug!(service, %status, url = %response.url(), "upstream response");

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RouteError::RateLimited { service });
        }

        if status.is_server_error() {
            return Err(RouteError::unavailable(service, status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RouteError::unavailable(service, e))?;

        serde_json::from_str(&body).map_err(|e| RouteError::InvalidResponse {
            service,
            message: if status.is_success() {
                e.to_string()
            } else {
                format!("HTTP {status}")
            },
            body: Some(body.chars().take(BODY_SNIPPET_CHARS).collect()),
        })
    }
}
