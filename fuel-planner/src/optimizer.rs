//! One optimization request, end to end.
//!
//! Resolves the route, filters stations along it, selects stops and prices
//! the trip. The whole request runs under a deadline; when it elapses the
//! outstanding upstream futures are dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{CachedRouteProvider, ResolvedRoute};
use crate::domain::{Coordinate, Location, RouteGeometry, RouteSource};
use crate::planner::{
    Candidate, FuelStop, InvalidVehicle, PlannerConfig, SelectError, VehicleProfile,
    filter_candidates, select_stops,
};
use crate::routing::RouteError;
use crate::stations::{StationError, StationRepository};

/// Default time budget for one request.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Errors from [`Optimizer::optimize`].
#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Stations(#[from] StationError),

    #[error(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    InvalidVehicle(#[from] InvalidVehicle),

    /// The request did not finish in time
    #[error("optimization exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),
}

/// What to plan.
#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    pub start: String,
    pub finish: String,
    pub vehicle: VehicleProfile,
}

impl OptimizeRequest {
    pub fn new(start: impl Into<String>, finish: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            finish: finish.into(),
            vehicle: VehicleProfile::default(),
        }
    }

    pub fn with_vehicle(mut self, vehicle: VehicleProfile) -> Self {
        self.vehicle = vehicle;
        self
    }
}

/// The route as reported back to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub total_distance_miles: f64,
    pub start: Location,
    pub finish: Location,
    pub points: Vec<Coordinate>,
    pub source: RouteSource,
}

impl From<&RouteGeometry> for RouteSummary {
    fn from(route: &RouteGeometry) -> Self {
        Self {
            total_distance_miles: route.total_distance_miles(),
            start: route.start().clone(),
            finish: route.finish().clone(),
            points: route.points().to_vec(),
            source: route.source(),
        }
    }
}

/// A priced refuelling plan.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub route: RouteSummary,
    pub vehicle: VehicleProfile,
    pub stops: Vec<FuelStop>,

    /// Everything burned on the trip, including the starting tank.
    pub total_fuel_units: f64,
    /// Stop purchases plus the starting tank's fuel at the mean candidate price.
    pub total_fuel_cost: f64,
    pub purchased_fuel_units: f64,
    pub purchased_fuel_cost: f64,

    pub candidates_considered: usize,
    /// Route cache misses plus the station query.
    pub external_calls: u32,
    /// Backend attempts behind those misses, retries included. On fallback
    /// this covers the failed live attempts as well as the offline ones.
    pub upstream_requests: u32,
    pub route_cache_hit: bool,
    /// Whether the route came from the offline fallback.
    pub used_fallback: bool,

    pub computation_time_ms: f64,
    pub computed_at: DateTime<Utc>,
}

/// Composes route resolution, candidate filtering and stop selection.
pub struct Optimizer {
    routes: Arc<CachedRouteProvider>,
    fallback: Option<Arc<CachedRouteProvider>>,
    stations: Arc<dyn StationRepository>,
    planner: PlannerConfig,
    deadline: Duration,
}

impl Optimizer {
    pub fn new(
        routes: Arc<CachedRouteProvider>,
        stations: Arc<dyn StationRepository>,
        planner: PlannerConfig,
    ) -> Self {
        Self {
            routes,
            fallback: None,
            stations,
            planner,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Re-resolve on `fallback` when the primary backend is unavailable.
    pub fn with_fallback(mut self, fallback: Arc<CachedRouteProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn routes(&self) -> &Arc<CachedRouteProvider> {
        &self.routes
    }

    pub fn stations(&self) -> &Arc<dyn StationRepository> {
        &self.stations
    }

    pub fn planner(&self) -> &PlannerConfig {
        &self.planner
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Plan and price refuelling stops for `request`.
    pub async fn optimize(
        &self,
        request: &OptimizeRequest,
    ) -> Result<OptimizationResult, OptimizeError> {
        match tokio::time::timeout(self.deadline, self.run(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    start = %request.start,
                    finish = %request.finish,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "optimization deadline exceeded"
                );
                Err(OptimizeError::DeadlineExceeded(self.deadline))
            }
        }
    }

    async fn run(&self, request: &OptimizeRequest) -> Result<OptimizationResult, OptimizeError> {
        let started = Instant::now();
        let vehicle = request.vehicle;
        vehicle.validate()?;

        let mut external_calls = 0;
        let mut upstream_requests = 0;
        let (resolved, used_fallback) = match self
            .routes
            .resolve_route_counted(&request.start, &request.finish)
            .await
        {
            (Ok(resolved), _) => (resolved, false),
            (Err(e @ RouteError::UpstreamUnavailable { .. }), attempts) => {
                let Some(fallback) = &self.fallback else {
                    return Err(e.into());
                };
                warn!(error = %e, attempts, "live routing unavailable, using offline fallback");
                external_calls += 1;
                upstream_requests += attempts;
                let resolved = fallback
                    .resolve_route(&request.start, &request.finish)
                    .await?;
                (resolved, true)
            }
            (Err(e), _) => return Err(e.into()),
        };

        let ResolvedRoute {
            geometry,
            cache_hit,
            upstream_requests: resolve_requests,
        } = resolved;
        upstream_requests += resolve_requests;
        if !cache_hit {
            external_calls += 1;
        }

        let candidates = filter_candidates(
            &geometry,
            self.planner.corridor_width_miles,
            self.stations.as_ref(),
        )?;
        external_calls += 1;

        let total_distance = geometry.total_distance_miles();
        let stops = select_stops(&candidates, total_distance, &vehicle, &self.planner)?;

        let purchased_fuel_units: f64 = stops.iter().map(|s| s.fuel_purchased_units).sum();
        let purchased_fuel_cost: f64 = stops.iter().map(|s| s.cost).sum();
        let starting_tank_miles = stops
            .first()
            .map_or(total_distance, FuelStop::distance_from_start_miles);
        let starting_tank_cost =
            starting_tank_miles * vehicle.units_per_mile * mean_price(&candidates);

        let result = OptimizationResult {
            route: RouteSummary::from(geometry.as_ref()),
            vehicle,
            total_fuel_units: total_distance * vehicle.units_per_mile,
            total_fuel_cost: purchased_fuel_cost + starting_tank_cost,
            purchased_fuel_units,
            purchased_fuel_cost,
            candidates_considered: candidates.len(),
            external_calls,
            upstream_requests,
            route_cache_hit: cache_hit,
            used_fallback,
            stops,
            computation_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            computed_at: Utc::now(),
        };

        info!(
            start = %request.start,
            finish = %request.finish,
            miles = total_distance,
            candidates = result.candidates_considered,
            stops = result.stops.len(),
            cost = result.total_fuel_cost,
            external_calls,
            cache_hit,
            elapsed_ms = result.computation_time_ms,
            "optimization complete"
        );

        Ok(result)
    }
}

/// Mean price over candidates, zero when there are none.
fn mean_price(candidates: &[Candidate]) -> f64 {
    if candidates.is_empty() {
        return 0.0;
    }
    candidates.iter().map(Candidate::price).sum::<f64>() / candidates.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, RouteCache};
    use crate::domain::{Locality, Station, StationId};
    use crate::routing::{LiveConfig, LiveRouteClient, OfflineRouteBackend, RetryPolicy, RouteBackend};
    use crate::stations::InMemoryStationRepository;

    fn offline_provider() -> Arc<CachedRouteProvider> {
        Arc::new(CachedRouteProvider::new(
            RouteBackend::Offline(OfflineRouteBackend::new()),
            Arc::new(RouteCache::new(&CacheConfig::default())),
            RetryPolicy::none(),
        ))
    }

    fn live_provider(base: &str) -> Arc<CachedRouteProvider> {
        let client = LiveRouteClient::new(
            LiveConfig::default()
                .with_nominatim_url(base)
                .with_osrm_url(base)
                .with_timeout(5),
        )
        .unwrap();
        Arc::new(CachedRouteProvider::new(
            RouteBackend::Live(client),
            Arc::new(RouteCache::new(&CacheConfig::default())),
            RetryPolicy::none(),
        ))
    }

    /// Stations on the offline straight line between two places, every 1/`n` of the way.
    fn stations_along(start: &str, finish: &str, n: u64) -> Vec<Station> {
        let a = OfflineRouteBackend.geocode(start).unwrap();
        let b = OfflineRouteBackend.geocode(finish).unwrap();
        (1..n)
            .map(|i| {
                Station::new(
                    StationId(i),
                    a.lerp(&b, i as f64 / n as f64),
                    3.0 + (i % 5) as f64 / 10.0,
                    Locality {
                        name: format!("Stop {i}"),
                        ..Locality::default()
                    },
                )
                .unwrap()
            })
            .collect()
    }

    fn optimizer(stations: Vec<Station>) -> Optimizer {
        Optimizer::new(
            offline_provider(),
            Arc::new(InMemoryStationRepository::new(stations)),
            PlannerConfig::default(),
        )
    }

    /// Local address with nothing listening.
    async fn dead_address() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn long_trip_end_to_end() {
        let optimizer = optimizer(stations_along("Sacramento, CA", "Omaha, NE", 60));
        let request = OptimizeRequest::new("Sacramento, CA", "Omaha, NE");

        let result = optimizer.optimize(&request).await.unwrap();

        assert!(result.route.total_distance_miles > 1000.0);
        assert_eq!(result.route.source, RouteSource::Offline);
        assert!(!result.stops.is_empty());
        assert_eq!(result.candidates_considered, 59);
        assert!(!result.route_cache_hit);
        assert_eq!(result.external_calls, 2);

        let mut previous = 0.0;
        for stop in &result.stops {
            assert!(stop.distance_from_start_miles() - previous <= 500.0 + 1e-6);
            previous = stop.distance_from_start_miles();
        }
        assert!(result.route.total_distance_miles - previous <= 500.0 + 1e-6);

        let units: f64 = result.stops.iter().map(|s| s.fuel_purchased_units).sum();
        assert!((result.purchased_fuel_units - units).abs() < 1e-9);
        assert!(result.total_fuel_cost > result.purchased_fuel_cost);
        assert!(
            (result.total_fuel_units - result.route.total_distance_miles * 0.1).abs() < 1e-9
        );
    }

    #[tokio::test]
    async fn repeat_request_hits_cache() {
        let optimizer = optimizer(stations_along("Sacramento, CA", "Omaha, NE", 60));
        let request = OptimizeRequest::new("Sacramento, CA", "Omaha, NE");

        let first = optimizer.optimize(&request).await.unwrap();
        let second = optimizer.optimize(&request).await.unwrap();

        assert!(second.route_cache_hit);
        assert_eq!(second.external_calls, 1);
        assert_eq!(second.upstream_requests, 0);
        assert_eq!(first.stops, second.stops);
    }

    #[tokio::test]
    async fn short_trip_prices_the_starting_tank() {
        // Same state, so at most a few hundred miles apart.
        let optimizer = optimizer(stations_along("Reno, NV", "Ely, NV", 10));
        let result = optimizer
            .optimize(&OptimizeRequest::new("Reno, NV", "Ely, NV"))
            .await
            .unwrap();

        assert!(result.route.total_distance_miles < 500.0);
        assert!(result.stops.is_empty());
        assert_eq!(result.purchased_fuel_cost, 0.0);

        // Prices 3.1, 3.2, 3.3, 3.4, 3.0, 3.1, 3.2, 3.3, 3.4
        let mean = 29.0 / 9.0;
        let expected = result.route.total_distance_miles * 0.1 * mean;
        assert!((result.total_fuel_cost - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn no_candidates_and_short_trip_costs_nothing() {
        let optimizer = optimizer(vec![]);
        let result = optimizer
            .optimize(&OptimizeRequest::new("Reno, NV", "Ely, NV"))
            .await
            .unwrap();

        assert!(result.stops.is_empty());
        assert_eq!(result.candidates_considered, 0);
        assert_eq!(result.total_fuel_cost, 0.0);
    }

    #[tokio::test]
    async fn long_trip_without_stations_is_infeasible() {
        let optimizer = optimizer(vec![]);
        let err = optimizer
            .optimize(&OptimizeRequest::new("Sacramento, CA", "Omaha, NE"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OptimizeError::Select(SelectError::RouteInfeasible { position_miles, .. })
                if position_miles == 0.0
        ));
    }

    #[tokio::test]
    async fn invalid_vehicle_fails_before_routing() {
        let optimizer = optimizer(vec![]);
        let request = OptimizeRequest::new("Reno, NV", "Ely, NV").with_vehicle(VehicleProfile {
            units_per_mile: 0.0,
            ..VehicleProfile::default()
        });

        let err = optimizer.optimize(&request).await.unwrap_err();
        assert!(matches!(err, OptimizeError::InvalidVehicle(_)));
        assert_eq!(optimizer.routes().miss_count(), 0);
    }

    #[tokio::test]
    async fn unknown_location_propagates() {
        let optimizer = optimizer(vec![]);
        let err = optimizer
            .optimize(&OptimizeRequest::new("   ", "Ely, NV"))
            .await
            .unwrap_err();
        assert!(matches!(err, OptimizeError::Route(RouteError::LocationNotFound(_))));
    }

    #[tokio::test]
    async fn unavailable_without_fallback_fails() {
        let optimizer = Optimizer::new(
            live_provider(&dead_address().await),
            Arc::new(InMemoryStationRepository::default()),
            PlannerConfig::default(),
        );

        let err = optimizer
            .optimize(&OptimizeRequest::new("Reno, NV", "Ely, NV"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OptimizeError::Route(RouteError::UpstreamUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn unavailable_with_fallback_uses_offline() {
        let live = live_provider(&dead_address().await);
        let fallback = offline_provider();
        let optimizer = Optimizer::new(
            Arc::clone(&live),
            Arc::new(InMemoryStationRepository::new(stations_along("Reno, NV", "Ely, NV", 10))),
            PlannerConfig::default(),
        )
        .with_fallback(Arc::clone(&fallback));

        let result = optimizer
            .optimize(&OptimizeRequest::new("Reno, NV", "Ely, NV"))
            .await
            .unwrap();

        assert!(result.used_fallback);
        assert_eq!(result.route.source, RouteSource::Offline);
        assert_eq!(result.external_calls, 3);
        // Two failed live geocodes, then two offline geocodes and a route.
        assert_eq!(result.upstream_requests, 5);

        // Fallback geometry stays out of the live cache.
        live.cache().sync().await;
        fallback.cache().sync().await;
        assert_eq!(live.cache().route_count(), 0);
        assert_eq!(fallback.cache().route_count(), 1);
    }

    #[tokio::test]
    async fn fallback_counts_live_retries() {
        let client = LiveRouteClient::new(
            LiveConfig::default()
                .with_nominatim_url(dead_address().await)
                .with_osrm_url(dead_address().await)
                .with_timeout(5),
        )
        .unwrap();
        let live = Arc::new(CachedRouteProvider::new(
            RouteBackend::Live(client),
            Arc::new(RouteCache::new(&CacheConfig::default())),
            RetryPolicy::default()
                .with_max_retries(1)
                .with_base_delay(Duration::from_millis(1)),
        ));
        let optimizer = Optimizer::new(
            live,
            Arc::new(InMemoryStationRepository::default()),
            PlannerConfig::default(),
        )
        .with_fallback(offline_provider());

        let result = optimizer
            .optimize(&OptimizeRequest::new("Reno, NV", "Ely, NV"))
            .await
            .unwrap();

        // Each live geocode tries twice before giving up: 4 live + 3 offline.
        assert!(result.used_fallback);
        assert_eq!(result.upstream_requests, 7);
    }

    #[tokio::test]
    async fn deadline_exceeded() {
        use axum::{Router, routing::get};

        let app = Router::new().route(
            "/search",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                r#"[{"lat": "39.5", "lon": "-119.8"}]"#
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let optimizer = Optimizer::new(
            live_provider(&format!("http://{addr}")),
            Arc::new(InMemoryStationRepository::default()),
            PlannerConfig::default(),
        )
        .with_deadline(Duration::from_millis(100));

        let started = Instant::now();
        let err = optimizer
            .optimize(&OptimizeRequest::new("Reno, NV", "Ely, NV"))
            .await
            .unwrap_err();

        assert!(matches!(err, OptimizeError::DeadlineExceeded(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn mean_price_of_nothing_is_zero() {
        assert_eq!(mean_price(&[]), 0.0);
    }
}
