use std::error::Error;
use std::sync::Arc;

use fuel_planner::cache::{CachedRouteProvider, RouteCache};
use fuel_planner::config::{AppConfig, BackendKind};
use fuel_planner::optimizer::Optimizer;
use fuel_planner::routing::{LiveRouteClient, OfflineRouteBackend, RetryPolicy, RouteBackend};
use fuel_planner::stations::InMemoryStationRepository;
use fuel_planner::web::{AppState, create_router};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fuel_planner=debug")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let backend = match config.backend {
        BackendKind::Live => RouteBackend::Live(LiveRouteClient::new(config.live.clone())?),
        BackendKind::Offline => RouteBackend::Offline(OfflineRouteBackend::new()),
    };
    let routes = Arc::new(CachedRouteProvider::new(
        backend,
        Arc::new(RouteCache::new(&config.cache)),
        config.retry.clone(),
    ));

    // Load stations (fail fast if the dataset is unusable). Rows without
    // coordinates are geocoded through the route provider and its cache.
    let (stations, summary) =
        InMemoryStationRepository::load(&config.stations_csv, &routes).await?;
    info!(
        path = %config.stations_csv.display(),
        loaded = summary.loaded,
        geocoded = summary.geocoded,
        skipped = summary.skipped,
        duplicates = summary.duplicates,
        "loaded fuel stations"
    );
    if stations.is_empty() {
        warn!("station dataset is empty; every long trip will be infeasible");
    }
    let stations = Arc::new(stations);

    let mut optimizer = Optimizer::new(routes, stations.clone(), config.planner.clone())
        .with_deadline(config.deadline);
    if config.backend == BackendKind::Live && config.offline_fallback {
        // Offline geometry never shares cache entries with live routes
        let fallback = CachedRouteProvider::new(
            RouteBackend::Offline(OfflineRouteBackend::new()),
            Arc::new(RouteCache::new(&config.cache)),
            RetryPolicy::none(),
        );
        optimizer = optimizer.with_fallback(Arc::new(fallback));
    }

    let state = AppState::new(optimizer, stations, config.vehicle);
    let app = create_router(state).layer(TraceLayer::new_for_http());

    info!(
        addr = %config.addr,
        backend = %config.backend,
        fallback = config.offline_fallback,
        "fuel planner listening"
    );
    info!("  GET  /api/health          - Health check");
    info!("  GET  /api/stations        - List stations");
    info!("  POST /api/optimize-route  - Plan fuel stops");

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
