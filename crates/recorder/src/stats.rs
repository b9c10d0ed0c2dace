//! Running figures shown while a ride is being recorded.

use rides::{
    models::GpsPoint,
    trip_summary::{DistanceMetric, TrackMetric},
};

/// Live read-out of an active session, over accepted samples only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveStats {
    pub points: usize,
    /// Haversine distance so far, in meters.
    pub distance_m: f64,
    /// Speed of the latest sample, in m/s.
    pub current_speed: Option<f64>,
    pub last_location: Option<GpsPoint>,
}

#[derive(Debug, Default)]
pub(crate) struct LiveMetric {
    distance: DistanceMetric,
    stats: LiveStats,
}

impl LiveMetric {
    pub(crate) fn current(&self) -> &LiveStats {
        &self.stats
    }
}

impl TrackMetric for LiveMetric {
    type Score = LiveStats;
    fn next_point(&mut self, point: &GpsPoint) {
        self.distance.next_point(point);
        self.stats.points += 1;
        self.stats.distance_m = self.distance.total();
        self.stats.current_speed = point.speed;
        self.stats.last_location = Some(point.clone());
    }

    fn finish(&mut self) -> LiveStats {
        self.stats.clone()
    }
}
