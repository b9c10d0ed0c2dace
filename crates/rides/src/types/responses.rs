//! Response types for API endpoints.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{Route, RoutePoint, RouteStatus, RouteSummary};

/// Returned when recording starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteResponse {
    pub id: Uuid,
    pub status: RouteStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
}

/// Batch upload outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPointsResponse {
    /// Points in the request.
    pub received: usize,
    /// Points persisted after the accuracy filter.
    pub stored: usize,
}

/// Summary of a stopped route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRouteResponse {
    pub id: Uuid,
    pub status: RouteStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub ended_at: OffsetDateTime,
    pub distance_m: f64,
    pub duration_s: i64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
}

impl StopRouteResponse {
    pub fn new(id: Uuid, summary: &RouteSummary) -> Self {
        Self {
            id,
            status: RouteStatus::Completed,
            ended_at: summary.ended_at,
            distance_m: summary.distance_m,
            duration_s: summary.duration_s,
            avg_speed_kmh: summary.avg_speed_kmh,
            max_speed_kmh: summary.max_speed_kmh,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTitleResponse {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRouteResponse {
    pub deleted: bool,
}

/// One page of a user's routes, newest first.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteListResponse {
    pub data: Vec<Route>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub next_cursor: Option<OffsetDateTime>,
}

/// Route detail including every stored point.
#[derive(Debug, Serialize)]
pub struct RouteWithPoints {
    #[serde(flatten)]
    pub route: Route,
    pub points: Vec<RoutePoint>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
