//! Great-circle distance between GPS fixes.

use geo::Point;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two points (x = longitude, y = latitude).
pub fn haversine_distance(from: Point, to: Point) -> f64 {
    let lat1_rad = from.y().to_radians();
    let lat2_rad = to.y().to_radians();
    let delta_lat = (to.y() - from.y()).to_radians();
    let delta_lon = (to.x() - from.x()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKYO_STATION: (f64, f64) = (35.6812, 139.7671);
    const SHIBUYA_STATION: (f64, f64) = (35.6580, 139.7016);

    fn point((lat, lon): (f64, f64)) -> Point {
        Point::new(lon, lat)
    }

    #[test]
    fn test_same_point_is_zero() {
        let d = haversine_distance(point(TOKYO_STATION), point(TOKYO_STATION));
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_tokyo_to_shibuya() {
        let d = haversine_distance(point(TOKYO_STATION), point(SHIBUYA_STATION));
        assert!(d > 6000.0 && d < 7000.0, "got {d}");
    }

    #[test]
    fn test_short_hop() {
        let d = haversine_distance(point(TOKYO_STATION), point((35.682, 139.768)));
        assert!(d > 50.0 && d < 200.0, "got {d}");
    }

    #[test]
    fn test_symmetric() {
        let a = haversine_distance(point(TOKYO_STATION), point(SHIBUYA_STATION));
        let b = haversine_distance(point(SHIBUYA_STATION), point(TOKYO_STATION));
        assert!((a - b).abs() < 1e-6);
    }
}
