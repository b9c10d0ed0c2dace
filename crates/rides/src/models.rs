use geo::Point;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

/// Samples reporting a horizontal uncertainty above this many meters are dropped.
pub const ACCURACY_FILTER_M: f64 = 50.0;

/// Lifecycle state of a route. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "route_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Recording,
    Completed,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Recording => "recording",
            RouteStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub status: RouteStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    pub distance_m: f64,
    pub duration_s: i64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Route {
    /// A fresh route in `recording` state, started now.
    pub fn new(user_id: Uuid) -> Self {
        Self::started_at(user_id, OffsetDateTime::now_utc())
    }

    pub fn started_at(user_id: Uuid, started_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: None,
            status: RouteStatus::Recording,
            started_at,
            ended_at: None,
            distance_m: 0.0,
            duration_s: 0,
            avg_speed_kmh: 0.0,
            max_speed_kmh: 0.0,
            created_at: started_at,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.status == RouteStatus::Recording
    }

    /// Writes a computed summary onto the route and marks it completed.
    pub fn apply_summary(&mut self, summary: &RouteSummary) {
        self.status = RouteStatus::Completed;
        self.ended_at = Some(summary.ended_at);
        self.distance_m = summary.distance_m;
        self.duration_s = summary.duration_s;
        self.avg_speed_kmh = summary.avg_speed_kmh;
        self.max_speed_kmh = summary.max_speed_kmh;
    }
}

/// Scalar statistics frozen onto a route when it is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    #[serde(with = "time::serde::rfc3339")]
    pub ended_at: OffsetDateTime,
    pub distance_m: f64,
    pub duration_s: i64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
}

/// One location sample as reported by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GpsPoint {
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub latitude: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "longitude must be between -180 and 180"
    ))]
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Meters per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "speed must not be negative"))]
    pub speed: Option<f64>,
    /// Degrees clockwise from true north.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 360.0, message = "heading must be between 0 and 360"))]
    pub heading: Option<f64>,
    /// Horizontal uncertainty in meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "accuracy must not be negative"))]
    pub accuracy: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64, recorded_at: OffsetDateTime) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            speed: None,
            heading: None,
            accuracy: None,
            recorded_at,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Position as a `geo` point (x = longitude, y = latitude).
    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }

    /// True unless the sample reports an accuracy worse than `threshold_m`.
    /// Samples without an accuracy reading are kept.
    pub fn passes_accuracy_filter(&self, threshold_m: f64) -> bool {
        self.accuracy.is_none_or(|accuracy| accuracy <= threshold_m)
    }
}

/// A persisted point, owned by exactly one route.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    pub id: Uuid,
    pub route_id: Uuid,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub point: GpsPoint,
}

impl RoutePoint {
    pub fn new(route_id: Uuid, point: GpsPoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            route_id,
            point,
        }
    }
}
