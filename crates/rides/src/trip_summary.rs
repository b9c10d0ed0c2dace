//! Trip statistics computed once, when a route is stopped.

use geo::Point;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    distance::haversine_distance,
    models::{GpsPoint, Route, RouteStatus, RouteSummary},
};

const MPS_TO_KMH: f64 = 3.6;

#[derive(Debug, Error, PartialEq)]
pub enum SummaryError {
    #[error("route {id} is {status}, expected recording")]
    InvalidState { id: Uuid, status: RouteStatus },
}

pub trait TrackMetric {
    type Score;
    fn next_point(&mut self, point: &GpsPoint);
    fn finish(&mut self) -> Self::Score;
}

/// Sequential Haversine sum over consecutive points, in meters.
#[derive(Debug, Clone, Default)]
pub struct DistanceMetric {
    total_distance: f64,
    last_point: Option<Point>,
}

impl DistanceMetric {
    pub fn total(&self) -> f64 {
        self.total_distance
    }
}

impl TrackMetric for DistanceMetric {
    type Score = f64;
    fn next_point(&mut self, point: &GpsPoint) {
        let current = point.point();
        self.total_distance += self
            .last_point
            .map_or(0.0, |prev| haversine_distance(prev, current));
        self.last_point = Some(current);
    }

    fn finish(&mut self) -> f64 {
        self.total_distance
    }
}

/// Highest reported speed in m/s. Points without a speed count as 0.
#[derive(Debug, Clone, Default)]
struct MaxSpeedMetric {
    max_speed: f64,
}

impl TrackMetric for MaxSpeedMetric {
    type Score = f64;
    fn next_point(&mut self, point: &GpsPoint) {
        self.max_speed = self.max_speed.max(point.speed.unwrap_or(0.0));
    }

    fn finish(&mut self) -> f64 {
        self.max_speed
    }
}

/// Computes the frozen summary of `route`, stopped at `ended_at`.
///
/// `points` must be ordered by `recorded_at` (ties in arrival order). Duration
/// comes from the route's start and stop times, not from point timestamps.
/// Fails without side effects when the route is not recording.
pub fn compute_summary(
    route: &Route,
    points: &[GpsPoint],
    ended_at: OffsetDateTime,
) -> Result<RouteSummary, SummaryError> {
    if route.status != RouteStatus::Recording {
        return Err(SummaryError::InvalidState {
            id: route.id,
            status: route.status,
        });
    }

    let mut distance = DistanceMetric::default();
    let mut max_speed = MaxSpeedMetric::default();
    for point in points {
        distance.next_point(point);
        max_speed.next_point(point);
    }
    let total_distance = distance.finish();

    // Clock skew between start and stop never yields a negative duration.
    let duration_s = ((ended_at - route.started_at).as_seconds_f64().round() as i64).max(0);

    let avg_speed_kmh = if duration_s > 0 {
        (total_distance / 1000.0) / (duration_s as f64 / 3600.0)
    } else {
        0.0
    };

    Ok(RouteSummary {
        ended_at,
        distance_m: total_distance.round(),
        duration_s,
        avg_speed_kmh: round_to_tenth(avg_speed_kmh),
        max_speed_kmh: round_to_tenth(max_speed.finish() * MPS_TO_KMH),
    })
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, macros::datetime};

    const START: OffsetDateTime = datetime!(2026-01-01 09:00 UTC);

    fn recording_route() -> Route {
        Route::started_at(Uuid::new_v4(), START)
    }

    fn point(lat: f64, lon: f64, offset_s: i64) -> GpsPoint {
        GpsPoint::new(lat, lon, START + Duration::seconds(offset_s))
    }

    fn path_distance(points: &[GpsPoint]) -> f64 {
        let mut distance = DistanceMetric::default();
        for point in points {
            distance.next_point(point);
        }
        distance.finish()
    }

    #[test]
    fn test_empty_points() {
        let summary =
            compute_summary(&recording_route(), &[], START + Duration::seconds(600)).unwrap();
        assert_eq!(summary.distance_m, 0.0);
        assert_eq!(summary.max_speed_kmh, 0.0);
        assert_eq!(summary.duration_s, 600);
        assert_eq!(summary.avg_speed_kmh, 0.0);
    }

    #[test]
    fn test_single_point() {
        let points = [point(35.6812, 139.7671, 0).with_speed(5.0)];
        let summary =
            compute_summary(&recording_route(), &points, START + Duration::seconds(60)).unwrap();
        assert_eq!(summary.distance_m, 0.0);
        assert_eq!(summary.max_speed_kmh, 18.0);
        assert_eq!(summary.duration_s, 60);
    }

    #[test]
    fn test_max_speed_from_point_speeds() {
        let points = [
            point(35.6812, 139.7671, 0).with_speed(0.0),
            point(35.6815, 139.7675, 5).with_speed(10.0),
            point(35.6818, 139.7679, 10).with_speed(20.0),
        ];
        let ended_at = START + Duration::seconds(95);
        let summary = compute_summary(&recording_route(), &points, ended_at).unwrap();
        assert_eq!(summary.max_speed_kmh, 72.0);
        assert_eq!(summary.duration_s, 95);
        assert_eq!(summary.ended_at, ended_at);
    }

    #[test]
    fn test_missing_speed_never_raises_max() {
        let points = [
            point(35.6812, 139.7671, 0).with_speed(3.0),
            point(35.6815, 139.7675, 5),
        ];
        let summary =
            compute_summary(&recording_route(), &points, START + Duration::seconds(10)).unwrap();
        assert_eq!(summary.max_speed_kmh, 10.8);
    }

    #[test]
    fn test_distance_and_average_speed() {
        let points = [point(35.6812, 139.7671, 0), point(35.6580, 139.7016, 1200)];
        let summary =
            compute_summary(&recording_route(), &points, START + Duration::hours(1)).unwrap();
        assert!(summary.distance_m > 6000.0 && summary.distance_m < 7000.0);
        assert_eq!(summary.distance_m.fract(), 0.0);
        // One hour elapsed: km/h equals kilometers travelled.
        let expected = (path_distance(&points) / 1000.0 * 10.0).round() / 10.0;
        assert_eq!(summary.avg_speed_kmh, expected);
    }

    #[test]
    fn test_zero_duration_average_is_zero() {
        let points = [point(35.6812, 139.7671, 0), point(35.6580, 139.7016, 1)];
        let summary = compute_summary(&recording_route(), &points, START).unwrap();
        assert_eq!(summary.duration_s, 0);
        assert_eq!(summary.avg_speed_kmh, 0.0);
        assert!(summary.distance_m > 0.0);
    }

    #[test]
    fn test_duplicate_coordinates_add_nothing() {
        let points = [
            point(35.6812, 139.7671, 0),
            point(35.6812, 139.7671, 5),
            point(35.6812, 139.7671, 10),
        ];
        assert_eq!(path_distance(&points), 0.0);
    }

    #[test]
    fn test_prefix_distance_non_decreasing() {
        let points: Vec<GpsPoint> = (0..20)
            .map(|i| {
                let wobble = if i % 2 == 0 { 0.0003 } else { -0.0002 };
                point(35.68 + i as f64 * 0.0004, 139.76 + wobble, i * 5)
            })
            .collect();

        let mut previous = 0.0;
        for n in 0..=points.len() {
            let d = path_distance(&points[..n]);
            assert!(d >= 0.0);
            assert!(d >= previous, "prefix {n}: {d} < {previous}");
            previous = d;
        }
    }

    #[test]
    fn test_completed_route_is_rejected() {
        let mut route = recording_route();
        let summary = compute_summary(&route, &[], START + Duration::seconds(600)).unwrap();
        route.apply_summary(&summary);
        let frozen = route.clone();

        let err = compute_summary(&route, &[], START + Duration::seconds(900)).unwrap_err();
        assert_eq!(
            err,
            SummaryError::InvalidState {
                id: route.id,
                status: RouteStatus::Completed,
            }
        );
        assert_eq!(route, frozen);
    }
}
