//! Geocoding for stations that arrive without a position.
//!
//! Lookups go through the shared [`CachedRouteProvider`], so they use the
//! configured backend, its retry policy and the geocode cache.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::cache::CachedRouteProvider;
use crate::domain::Station;

use super::dataset::{LoadSummary, StationRecords, UnlocatedStation};

/// Station lookups in flight at once. The live client applies its own limit on top.
pub const GEOCODE_CONCURRENCY: usize = 4;

const PROGRESS_EVERY: usize = 100;

/// Geocode every unlocated row and merge the results with the located ones.
///
/// Rows that cannot be geocoded are dropped and counted as skipped.
pub async fn locate_stations(
    records: StationRecords,
    geocoder: &CachedRouteProvider,
) -> (Vec<Station>, LoadSummary) {
    let StationRecords {
        mut located,
        unlocated,
        mut summary,
    } = records;

    let total = unlocated.len();
    if total == 0 {
        return (located, summary);
    }
    info!(
        total,
        source = %geocoder.backend().source(),
        "geocoding stations without positions"
    );

    let mut results = stream::iter(unlocated)
        .map(|row| locate_one(row, geocoder))
        .buffer_unordered(GEOCODE_CONCURRENCY);

    let mut done = 0;
    let mut failed = 0;
    while let Some(result) = results.next().await {
        done += 1;
        match result {
            Some(station) => {
                located.push(station);
                summary.loaded += 1;
                summary.geocoded += 1;
            }
            None => {
                failed += 1;
                summary.skipped += 1;
            }
        }

        if done % PROGRESS_EVERY == 0 || done == total {
            info!(done, total, failed, "station geocoding progress");
        }
    }

    (located, summary)
}

async fn locate_one(row: UnlocatedStation, geocoder: &CachedRouteProvider) -> Option<Station> {
    let mut position = None;
    for query in row.geocode_queries() {
        match geocoder.geocode(&query).await {
            Ok((found, _)) => {
                position = Some(found);
                break;
            }
            Err(e) => debug!(id = %row.id, query, error = %e, "station geocode failed"),
        }
    }

    let Some(position) = position else {
        warn!(id = %row.id, name = %row.locality.name, "could not geocode station");
        return None;
    };
    row.locate(position).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{Cursor, Write};
    use std::sync::Arc;

    use axum::Router;
    use axum::extract::Query;
    use axum::routing::get;

    use crate::cache::{CacheConfig, RouteCache};
    use crate::domain::StationId;
    use crate::routing::{LiveConfig, LiveRouteClient, OfflineRouteBackend, RetryPolicy, RouteBackend};
    use crate::stations::{InMemoryStationRepository, StationRepository, read_stations};

    const OPIS_HEADER: &str =
        "OPIS Truckstop ID,Truckstop Name,Address,City,State,Rack ID,Retail Price\n";

    fn provider(backend: RouteBackend) -> CachedRouteProvider {
        CachedRouteProvider::new(
            backend,
            Arc::new(RouteCache::new(&CacheConfig::default())),
            RetryPolicy::none(),
        )
    }

    fn offline() -> CachedRouteProvider {
        provider(RouteBackend::Offline(OfflineRouteBackend::new()))
    }

    #[tokio::test]
    async fn opis_export_loads_through_offline_geocoder() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{OPIS_HEADER}\
             7,WOODSHED OF BIG CABIN,\"I-44, EXIT 283 & US-69\",Big Cabin,OK,307,3.00733\n\
             8,PILOT #123,I-80 EXIT 301,Elko,NV,12,3.459\n"
        )
        .unwrap();

        let geocoder = offline();
        let (repo, summary) = InMemoryStationRepository::load(file.path(), &geocoder)
            .await
            .unwrap();

        assert_eq!(repo.station_count(), 2);
        assert_eq!(summary.loaded, 2);
        assert_eq!(summary.geocoded, 2);
        assert_eq!(summary.skipped, 0);

        let big_cabin = repo
            .list(&Default::default())
            .into_iter()
            .find(|s| s.id == StationId(7))
            .unwrap();
        // Offline positions land within a few degrees of the state center.
        assert!((big_cabin.position.lat() - 35.6).abs() <= 2.0);
        assert!((big_cabin.position.lng() - -97.5).abs() <= 2.0);

        geocoder.cache().sync().await;
        assert_eq!(geocoder.cache().geocode_count(), 2);
    }

    #[tokio::test]
    async fn located_rows_are_kept_as_is() {
        let csv = "OPIS Truckstop ID,Truckstop Name,Address,City,State,Rack ID,Retail Price,Latitude,Longitude\n\
                   1,Known,a,Reno,NV,1,3.10,39.5,-119.8\n\
                   2,Unknown,b,Elko,NV,1,3.20,,\n";
        let records = read_stations(Cursor::new(csv)).unwrap();

        let geocoder = offline();
        let (stations, summary) = locate_stations(records, &geocoder).await;

        assert_eq!(stations.len(), 2);
        let known = stations.iter().find(|s| s.id == StationId(1)).unwrap();
        assert_eq!(known.position.lat(), 39.5);
        assert_eq!(known.position.lng(), -119.8);
        assert_eq!(summary.loaded, 2);
        assert_eq!(summary.geocoded, 1);
    }

    #[tokio::test]
    async fn falls_back_to_city_and_skips_failures() {
        // Only the coarse "city, state" query resolves.
        let app = Router::new().route(
            "/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                if params.get("q").map(String::as_str) == Some("Big Cabin, OK") {
                    r#"[{"lat": "36.53", "lon": "-95.22"}]"#
                } else {
                    "[]"
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = LiveRouteClient::new(
            LiveConfig::default()
                .with_nominatim_url(&base)
                .with_osrm_url(&base)
                .with_timeout(5),
        )
        .unwrap();
        let geocoder = provider(RouteBackend::Live(client));

        let csv = format!(
            "{OPIS_HEADER}\
             7,WOODSHED,\"I-44, EXIT 283\",Big Cabin,OK,307,3.00\n\
             9,NOWHERE,Route 1,Atlantis,ZZ,1,3.00\n"
        );
        let records = read_stations(Cursor::new(csv)).unwrap();
        let (stations, summary) = locate_stations(records, &geocoder).await;

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].id, StationId(7));
        assert_eq!(stations[0].position.lat(), 36.53);
        assert_eq!(summary.geocoded, 1);
        assert_eq!(summary.skipped, 1);
    }
}
