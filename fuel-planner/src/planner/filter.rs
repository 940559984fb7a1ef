//! Reduce the station set to candidates along a route.

use tracing::debug;

use crate::domain::RouteGeometry;
use crate::geo::{BoundingBox, distance_to_polyline};
use crate::stations::{StationError, StationRepository};

use super::candidate::Candidate;

/// Stations within `corridor_width_miles` of the route, in along-route order.
///
/// Makes exactly one repository query (the route's bounding box widened by
/// the corridor), then keeps stations whose offset is at most the corridor
/// width. The boundary is closed.
pub fn filter_candidates<R>(
    route: &RouteGeometry,
    corridor_width_miles: f64,
    repository: &R,
) -> Result<Vec<Candidate>, StationError>
where
    R: StationRepository + ?Sized,
{
    let bbox = BoundingBox::around_route(route, corridor_width_miles);
    let in_box = repository.stations_in_bounding_box(&bbox)?;
    let boxed = in_box.len();

    let mut candidates: Vec<Candidate> = in_box
        .into_iter()
        .filter_map(|station| {
            let projection = distance_to_polyline(&station.position, route);
            (projection.offset_miles <= corridor_width_miles).then(|| Candidate {
                station,
                distance_from_start_miles: projection.distance_from_start_miles,
                corridor_offset_miles: projection.offset_miles,
                route_segment: projection.segment_index,
            })
        })
        .collect();

    candidates.sort_by(Candidate::route_order);

    debug!(
        in_box = boxed,
        in_corridor = candidates.len(),
        corridor_width_miles,
        "filtered candidate stations"
    );

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, Locality, Location, RouteSource, Station, StationId};
    use crate::geo::{MILES_PER_DEGREE_LAT, polyline_length_miles};
    use crate::stations::InMemoryStationRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn station(id: u64, lat: f64, lng: f64, price: f64) -> Station {
        Station::new(StationId(id), c(lat, lng), price, Locality::default()).unwrap()
    }

    /// Route east along the equator from lng 0 to lng 10.
    fn equator_route() -> RouteGeometry {
        let points = vec![c(0.0, 0.0), c(0.0, 5.0), c(0.0, 10.0)];
        let total = polyline_length_miles(&points);
        RouteGeometry::new(
            points,
            total,
            Location::new("a", c(0.0, 0.0)),
            Location::new("b", c(0.0, 10.0)),
            RouteSource::Offline,
        )
        .unwrap()
    }

    struct CountingRepo {
        inner: InMemoryStationRepository,
        calls: AtomicUsize,
    }

    impl StationRepository for CountingRepo {
        fn stations_in_bounding_box(
            &self,
            bbox: &BoundingBox,
        ) -> Result<Vec<Station>, StationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.stations_in_bounding_box(bbox)
        }

        fn station_count(&self) -> usize {
            self.inner.len()
        }
    }

    #[test]
    fn keeps_corridor_stations_in_route_order() {
        let repo = InMemoryStationRepository::new(vec![
            station(1, 0.1, 8.0, 3.0),
            station(2, -0.2, 2.0, 3.5),
            station(3, 3.0, 5.0, 2.0), // ~207 miles off route
            station(4, 0.0, 2.0, 3.1),
        ]);

        let candidates = filter_candidates(&equator_route(), 20.0, &repo).unwrap();
        let ids: Vec<u64> = candidates.iter().map(|c| c.id().0).collect();
        assert_eq!(ids, vec![4, 2, 1]);

        assert!(candidates.iter().all(|c| c.corridor_offset_miles <= 20.0));
        assert_eq!(candidates[0].route_segment, 0);
        assert_eq!(candidates[2].route_segment, 1);
    }

    #[test]
    fn single_repository_query() {
        let repo = CountingRepo {
            inner: InMemoryStationRepository::new(vec![station(1, 0.0, 1.0, 3.0)]),
            calls: AtomicUsize::new(0),
        };
        filter_candidates(&equator_route(), 50.0, &repo).unwrap();
        assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn corridor_boundary_is_closed() {
        let s = station(1, 0.5, 5.0, 3.0);
        let offset = distance_to_polyline(&s.position, &equator_route()).offset_miles;
        let repo = InMemoryStationRepository::new(vec![s]);

        assert_eq!(filter_candidates(&equator_route(), offset, &repo).unwrap().len(), 1);
        assert!(
            filter_candidates(&equator_route(), offset - 1e-6, &repo)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn empty_repository_gives_no_candidates() {
        let repo = InMemoryStationRepository::default();
        assert!(filter_candidates(&equator_route(), 75.0, &repo).unwrap().is_empty());
    }

    #[test]
    fn stations_past_the_ends_project_onto_endpoints() {
        let repo = InMemoryStationRepository::new(vec![
            station(1, 0.0, -0.2, 3.0),
            station(2, 0.0, 10.2, 3.0),
        ]);
        let route = equator_route();
        let candidates = filter_candidates(&route, MILES_PER_DEGREE_LAT, &repo).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].distance_from_start_miles, 0.0);
        assert!(
            (candidates[1].distance_from_start_miles - route.total_distance_miles()).abs() < 1e-6
        );
    }
}
