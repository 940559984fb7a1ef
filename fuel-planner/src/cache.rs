//! Caching layer for geocodes and routes.
//!
//! Routes are cached for an hour and geocodes for a day, both keyed by the
//! normalized location text. Repeated endpoints cost nothing even when the
//! pair is new, so a warm cache turns most requests into a single routing
//! call or none at all.
//!
//! There is no single-flight: two simultaneous misses for the same pair may
//! both go upstream. The last insert wins and both callers get valid data.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join;
use moka::future::Cache as MokaCache;
use tracing::{debug, info};

use crate::domain::{Coordinate, Location, RouteGeometry};
use crate::routing::retry::retry;
use crate::routing::{RetryPolicy, RouteBackend, RouteError};

/// Cache key for routes: normalized (start, finish).
type RouteKey = (String, String);

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached routes.
    pub route_ttl: Duration,

    /// TTL for cached geocodes.
    pub geocode_ttl: Duration,

    /// Maximum number of entries in each cache.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            route_ttl: Duration::from_secs(60 * 60),
            geocode_ttl: Duration::from_secs(24 * 60 * 60),
            max_capacity: 10_000,
        }
    }
}

/// Canonical form of location text used for cache keys.
pub fn normalize_location(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Route and geocode store. Built once and shared by `Arc`.
pub struct RouteCache {
    routes: MokaCache<RouteKey, Arc<RouteGeometry>>,
    geocodes: MokaCache<String, Coordinate>,
}

impl RouteCache {
    pub fn new(config: &CacheConfig) -> Self {
        let routes = MokaCache::builder()
            .time_to_live(config.route_ttl)
            .max_capacity(config.max_capacity)
            .build();
        let geocodes = MokaCache::builder()
            .time_to_live(config.geocode_ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { routes, geocodes }
    }

    pub async fn get_route(&self, start: &str, finish: &str) -> Option<Arc<RouteGeometry>> {
        self.routes.get(&route_key(start, finish)).await
    }

    pub async fn insert_route(&self, start: &str, finish: &str, route: Arc<RouteGeometry>) {
        self.routes.insert(route_key(start, finish), route).await;
    }

    pub async fn get_geocode(&self, query: &str) -> Option<Coordinate> {
        self.geocodes.get(&normalize_location(query)).await
    }

    pub async fn insert_geocode(&self, query: &str, position: Coordinate) {
        self.geocodes.insert(normalize_location(query), position).await;
    }

    /// Approximate number of cached routes (for monitoring).
    pub fn route_count(&self) -> u64 {
        self.routes.entry_count()
    }

    /// Approximate number of cached geocodes (for monitoring).
    pub fn geocode_count(&self) -> u64 {
        self.geocodes.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.routes.invalidate_all();
        self.geocodes.invalidate_all();
    }

    /// Flush moka's pending maintenance so counts are exact.
    pub async fn sync(&self) {
        self.routes.run_pending_tasks().await;
        self.geocodes.run_pending_tasks().await;
    }
}

fn route_key(start: &str, finish: &str) -> RouteKey {
    (normalize_location(start), normalize_location(finish))
}

/// Outcome of resolving a trip.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub geometry: Arc<RouteGeometry>,
    pub cache_hit: bool,
    /// Backend attempts made, retries included. Zero on a route cache hit.
    pub upstream_requests: u32,
}

/// Route backend with caching and retry.
pub struct CachedRouteProvider {
    backend: RouteBackend,
    cache: Arc<RouteCache>,
    retry: RetryPolicy,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedRouteProvider {
    pub fn new(backend: RouteBackend, cache: Arc<RouteCache>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            cache,
            retry,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Resolve `start` → `finish` into route geometry, from cache if possible.
    pub async fn resolve_route(
        &self,
        start: &str,
        finish: &str,
    ) -> Result<ResolvedRoute, RouteError> {
        self.resolve_route_counted(start, finish).await.0
    }

    /// Like [`resolve_route`](Self::resolve_route), but also returns the
    /// backend attempts made, so failed resolutions can be accounted for.
    pub async fn resolve_route_counted(
        &self,
        start: &str,
        finish: &str,
    ) -> (Result<ResolvedRoute, RouteError>, u32) {
        let (start, finish) = (start.trim(), finish.trim());

        if let Some(geometry) = self.cache.get_route(start, finish).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(start, finish, "route cache hit");
            let resolved = ResolvedRoute {
                geometry,
                cache_hit: true,
                upstream_requests: 0,
            };
            return (Ok(resolved), 0);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(start, finish, source = %self.backend.source(), "route cache miss");

        let ((start_pos, start_calls), (finish_pos, finish_calls)) =
            join(self.geocode_counted(start), self.geocode_counted(finish)).await;
        let mut upstream_requests = start_calls + finish_calls;

        let (start_pos, finish_pos) = match (start_pos, finish_pos) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => return (Err(e), upstream_requests),
        };
        let start_loc = Location::new(start, start_pos);
        let finish_loc = Location::new(finish, finish_pos);

        let (result, route_calls) = retry(&self.retry, "route", || {
            self.backend.route(&start_loc, &finish_loc)
        })
        .await;
        upstream_requests += route_calls;
        let geometry = match result {
            Ok(geometry) => Arc::new(geometry),
            Err(e) => return (Err(e), upstream_requests),
        };

        self.cache
            .insert_route(start, finish, Arc::clone(&geometry))
            .await;

        info!(
            start,
            finish,
            miles = geometry.total_distance_miles(),
            points = geometry.points().len(),
            upstream_requests,
            "route resolved"
        );

        let resolved = ResolvedRoute {
            geometry,
            cache_hit: false,
            upstream_requests,
        };
        (Ok(resolved), upstream_requests)
    }

    /// Geocode through the cache. Returns the position and backend attempts.
    pub async fn geocode(&self, query: &str) -> Result<(Coordinate, u32), RouteError> {
        let (result, attempts) = self.geocode_counted(query).await;
        result.map(|position| (position, attempts))
    }

    async fn geocode_counted(&self, query: &str) -> (Result<Coordinate, RouteError>, u32) {
        if let Some(position) = self.cache.get_geocode(query).await {
            debug!(query, "geocode cache hit");
            return (Ok(position), 0);
        }

        let (result, attempts) =
            retry(&self.retry, "geocode", || self.backend.geocode(query)).await;
        if let Ok(position) = result {
            self.cache.insert_geocode(query, position).await;
        }

        (result, attempts)
    }

    pub fn backend(&self) -> &RouteBackend {
        &self.backend
    }

    pub fn cache(&self) -> &Arc<RouteCache> {
        &self.cache
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
