//! Geometric helpers over latitude/longitude coordinates.
//!
//! Distances are great-circle miles. Projection onto a route uses a local
//! equirectangular frame per segment, which is accurate at the scale of a
//! single polyline segment and much cheaper than exact spherical projection.

use serde::Serialize;

use crate::domain::{Coordinate, RouteGeometry};

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Approximate miles per degree of latitude, used for bounding-box margins.
pub const MILES_PER_DEGREE_LAT: f64 = 69.0;

/// Lower bound on cos(latitude) when converting a margin to longitude degrees.
const MIN_LNG_SCALE: f64 = 0.01;

/// Great-circle distance between two coordinates (haversine formula).
pub fn haversine_miles(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.lat().to_radians();
    let phi2 = b.lat().to_radians();
    let dphi = (b.lat() - a.lat()).to_radians();
    let dlambda = (b.lng() - a.lng()).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().min(1.0).asin()
}

/// Sum of great-circle lengths of consecutive points.
pub fn polyline_length_miles(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_miles(&w[0], &w[1]))
        .sum()
}

/// Axis-aligned latitude/longitude box, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Smallest box containing every route vertex, widened by `margin_miles`.
    ///
    /// The longitude margin is converted at the box's most poleward latitude,
    /// where a degree of longitude is shortest, so the box never cuts into
    /// the corridor it is meant to cover.
    pub fn around_route(route: &RouteGeometry, margin_miles: f64) -> Self {
        let points = route.points();
        let first = points[0];
        let mut bbox = BoundingBox {
            min_lat: first.lat(),
            max_lat: first.lat(),
            min_lng: first.lng(),
            max_lng: first.lng(),
        };

        for p in &points[1..] {
            bbox.min_lat = bbox.min_lat.min(p.lat());
            bbox.max_lat = bbox.max_lat.max(p.lat());
            bbox.min_lng = bbox.min_lng.min(p.lng());
            bbox.max_lng = bbox.max_lng.max(p.lng());
        }

        bbox.expand(margin_miles)
    }

    fn expand(self, margin_miles: f64) -> Self {
        let margin_miles = margin_miles.max(0.0);
        let lat_margin = margin_miles / MILES_PER_DEGREE_LAT;

        let min_lat = (self.min_lat - lat_margin).max(-90.0);
        let max_lat = (self.max_lat + lat_margin).min(90.0);

        let poleward = min_lat.abs().max(max_lat.abs());
        let lng_scale = poleward.to_radians().cos().max(MIN_LNG_SCALE);
        let lng_margin = margin_miles / (MILES_PER_DEGREE_LAT * lng_scale);

        BoundingBox {
            min_lat,
            max_lat,
            min_lng: (self.min_lng - lng_margin).max(-180.0),
            max_lng: (self.max_lng + lng_margin).min(180.0),
        }
    }

    /// Whether a coordinate lies inside the box (edges included).
    pub fn contains(&self, c: &Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&c.lat())
            && (self.min_lng..=self.max_lng).contains(&c.lng())
    }
}

/// Where a point sits relative to a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineProjection {
    /// Distance from the point to the closest point on the route.
    pub offset_miles: f64,
    /// Along-route distance from the start to that closest point.
    pub distance_from_start_miles: f64,
    /// Index of the segment containing the closest point.
    pub segment_index: usize,
}

/// Project `point` onto the route polyline.
///
/// Each segment is tested with the projection clamped to the segment, not the
/// infinite line through it. The minimum-offset segment wins; on exact ties
/// the earliest segment (and the earliest point within it) wins.
/// Along-route distances are scaled so the finish vertex sits at the route's
/// reported total distance.
pub fn distance_to_polyline(point: &Coordinate, route: &RouteGeometry) -> PolylineProjection {
    let points = route.points();
    let polyline_len = polyline_length_miles(points);
    let scale = if polyline_len > 0.0 {
        route.total_distance_miles() / polyline_len
    } else {
        1.0
    };

    let mut best = PolylineProjection {
        offset_miles: f64::INFINITY,
        distance_from_start_miles: 0.0,
        segment_index: 0,
    };
    let mut cumulative = 0.0;

    for (i, w) in points.windows(2).enumerate() {
        let (a, b) = (&w[0], &w[1]);
        let segment_len = haversine_miles(a, b);

        // The planar foot is only approximately closest on the sphere, so the
        // endpoints are checked too.
        for t in [segment_fraction(point, a, b), 0.0, 1.0] {
            let offset = haversine_miles(point, &a.lerp(b, t));
            if offset < best.offset_miles {
                best = PolylineProjection {
                    offset_miles: offset,
                    distance_from_start_miles: (cumulative + t * segment_len) * scale,
                    segment_index: i,
                };
            }
        }

        cumulative += segment_len;
    }

    best
}

/// Fraction along segment `a`→`b` of the foot of the perpendicular from `p`,
/// clamped to [0, 1].
fn segment_fraction(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    let kx = ((a.lat() + b.lat()) / 2.0).to_radians().cos();
    let dx = (b.lng() - a.lng()) * kx;
    let dy = b.lat() - a.lat();
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return 0.0;
    }

    let px = (p.lng() - a.lng()) * kx;
    let py = p.lat() - a.lat();
    ((px * dx + py * dy) / len2).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Location, RouteSource};

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn route(points: Vec<Coordinate>) -> RouteGeometry {
        let total = polyline_length_miles(&points);
        let start = Location::new("start", points[0]);
        let finish = Location::new("finish", *points.last().unwrap());
        RouteGeometry::new(points, total, start, finish, RouteSource::Offline).unwrap()
    }

    #[test]
    fn haversine_known_distance() {
        // San Francisco to Los Angeles is roughly 347 miles as the crow flies.
        let sf = c(37.7749, -122.4194);
        let la = c(34.0522, -118.2437);
        let d = haversine_miles(&sf, &la);
        assert!((d - 347.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn haversine_zero_and_symmetric() {
        let a = c(40.0, -100.0);
        let b = c(41.0, -101.0);
        assert_eq!(haversine_miles(&a, &a), 0.0);
        assert!((haversine_miles(&a, &b) - haversine_miles(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn one_degree_latitude_is_about_69_miles() {
        let d = haversine_miles(&c(40.0, -100.0), &c(41.0, -100.0));
        assert!((d - 69.09).abs() < 0.05, "got {d}");
    }

    #[test]
    fn bounding_box_contains_route_and_margin() {
        let r = route(vec![c(35.0, -110.0), c(36.0, -105.0), c(35.5, -100.0)]);
        let bbox = BoundingBox::around_route(&r, 69.0);

        assert!((bbox.min_lat - 34.0).abs() < 1e-9);
        assert!((bbox.max_lat - 37.0).abs() < 1e-9);
        assert!(bbox.min_lng < -110.0 - 1.0);
        assert!(bbox.max_lng > -100.0 + 1.0);
        for p in r.points() {
            assert!(bbox.contains(p));
        }
        assert!(!bbox.contains(&c(33.9, -105.0)));
    }

    #[test]
    fn bounding_box_zero_margin_is_tight() {
        let r = route(vec![c(35.0, -110.0), c(36.0, -105.0)]);
        let bbox = BoundingBox::around_route(&r, 0.0);
        assert_eq!(
            bbox,
            BoundingBox {
                min_lat: 35.0,
                max_lat: 36.0,
                min_lng: -110.0,
                max_lng: -105.0,
            }
        );
    }

    #[test]
    fn bounding_box_clamps_to_globe() {
        let r = route(vec![c(89.5, 179.5), c(89.0, 179.0)]);
        let bbox = BoundingBox::around_route(&r, 500.0);
        assert_eq!(bbox.max_lat, 90.0);
        assert_eq!(bbox.max_lng, 180.0);
    }

    #[test]
    fn projection_onto_straight_route() {
        // East-west route along the 40th parallel.
        let r = route(vec![c(40.0, -105.0), c(40.0, -100.0)]);
        let station = c(40.5, -102.5);
        let proj = distance_to_polyline(&station, &r);

        // Half a degree of latitude off the road.
        assert!((proj.offset_miles - 34.5).abs() < 0.5, "got {}", proj.offset_miles);
        // Halfway along the route.
        let half = r.total_distance_miles() / 2.0;
        assert!((proj.distance_from_start_miles - half).abs() < 1.0);
        assert_eq!(proj.segment_index, 0);
    }

    #[test]
    fn projection_clamps_to_segment_end() {
        let r = route(vec![c(40.0, -105.0), c(40.0, -100.0)]);
        // Beyond the finish, on the extension of the line.
        let station = c(40.0, -99.0);
        let proj = distance_to_polyline(&station, &r);

        assert!((proj.distance_from_start_miles - r.total_distance_miles()).abs() < 1e-6);
        let to_finish = haversine_miles(&station, &c(40.0, -100.0));
        assert!((proj.offset_miles - to_finish).abs() < 1e-6);
    }

    #[test]
    fn projection_picks_nearest_segment() {
        // An L-shaped route: east, then north.
        let r = route(vec![c(40.0, -105.0), c(40.0, -100.0), c(44.0, -100.0)]);
        let station = c(43.0, -100.2);
        let proj = distance_to_polyline(&station, &r);

        assert_eq!(proj.segment_index, 1);
        assert!(proj.offset_miles < 15.0);
        let first_leg = haversine_miles(&c(40.0, -105.0), &c(40.0, -100.0));
        assert!(proj.distance_from_start_miles > first_leg);
    }

    #[test]
    fn along_route_distance_scales_to_reported_total() {
        let points = vec![c(40.0, -105.0), c(40.0, -100.0)];
        let geometric = polyline_length_miles(&points);
        let start = Location::new("a", points[0]);
        let finish = Location::new("b", points[1]);
        let r = RouteGeometry::new(points, geometric * 1.2, start, finish, RouteSource::Osrm)
            .unwrap();

        let proj = distance_to_polyline(&c(40.0, -100.0), &r);
        assert!((proj.distance_from_start_miles - geometric * 1.2).abs() < 1e-6);
    }
}
