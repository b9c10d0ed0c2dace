//! Persistence seam for routes and their points.
//!
//! [`Database`](crate::database::Database) is the PostgreSQL implementation;
//! [`MemoryStore`] keeps everything in process and backs the test suite and
//! the no-database dev mode.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::{GpsPoint, Route, RoutePoint, RouteStatus, RouteSummary},
    trip_summary,
    types::ListRoutesQuery,
};

pub type SharedStore = Arc<dyn RouteStore>;

#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn create_route(&self, route: &Route) -> Result<(), AppError>;

    /// The caller's routes matching `query`, newest first, at most `fetch` rows.
    async fn list_routes(
        &self,
        user_id: Uuid,
        query: &ListRoutesQuery,
        fetch: i64,
    ) -> Result<Vec<Route>, AppError>;

    /// A route owned by `user_id`. Routes owned by someone else are `None`.
    async fn get_route(&self, user_id: Uuid, id: Uuid) -> Result<Option<Route>, AppError>;

    /// All points of a route ordered by `recorded_at`, ties in arrival order.
    async fn get_route_points(&self, route_id: Uuid) -> Result<Vec<RoutePoint>, AppError>;

    /// Appends points to a recording route as one unit.
    ///
    /// Fails with `InvalidState` when the route is no longer recording and
    /// `NotFound` when it vanished; nothing is written in either case.
    async fn append_points(&self, route_id: Uuid, points: &[GpsPoint]) -> Result<(), AppError>;

    /// Completes a recording route with the summary of every point it holds.
    ///
    /// Locking the route, reading its points and writing the summary happen
    /// as one unit: a concurrent batch is either counted or refused with
    /// `InvalidState`, never stored uncounted. Fails with `NotFound` for
    /// routes not owned by `user_id` and `InvalidState` when the route is
    /// already completed; nothing changes in either case.
    async fn complete_route(
        &self,
        user_id: Uuid,
        route_id: Uuid,
        ended_at: OffsetDateTime,
    ) -> Result<RouteSummary, AppError>;

    /// Returns `false` when no such route is owned by `user_id`.
    async fn update_title(&self, user_id: Uuid, id: Uuid, title: &str) -> Result<bool, AppError>;

    /// Removes a route together with all of its points.
    async fn delete_route(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;
}

struct StoredRoute {
    route: Route,
    points: Vec<RoutePoint>,
}

impl StoredRoute {
    /// Points by `recorded_at`. The sort is stable, so ties keep arrival order.
    fn ordered_points(&self) -> Vec<RoutePoint> {
        let mut points = self.points.clone();
        points.sort_by(|a, b| a.point.recorded_at.cmp(&b.point.recorded_at));
        points
    }
}

/// In-process store. Cloning shares the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    routes: Arc<RwLock<HashMap<Uuid, StoredRoute>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn point_count(&self, route_id: Uuid) -> usize {
        self.routes
            .read()
            .await
            .get(&route_id)
            .map_or(0, |stored| stored.points.len())
    }
}

#[async_trait]
impl RouteStore for MemoryStore {
    async fn create_route(&self, route: &Route) -> Result<(), AppError> {
        self.routes.write().await.insert(
            route.id,
            StoredRoute {
                route: route.clone(),
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn list_routes(
        &self,
        user_id: Uuid,
        query: &ListRoutesQuery,
        fetch: i64,
    ) -> Result<Vec<Route>, AppError> {
        let routes = self.routes.read().await;
        let mut matching: Vec<Route> = routes
            .values()
            .map(|stored| &stored.route)
            .filter(|r| r.user_id == user_id)
            .filter(|r| query.from.is_none_or(|from| r.started_at >= from))
            .filter(|r| query.to.is_none_or(|to| r.started_at <= to))
            .filter(|r| query.cursor.is_none_or(|cursor| r.started_at < cursor))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matching.truncate(usize::try_from(fetch).unwrap_or(0));
        Ok(matching)
    }

    async fn get_route(&self, user_id: Uuid, id: Uuid) -> Result<Option<Route>, AppError> {
        Ok(self
            .routes
            .read()
            .await
            .get(&id)
            .filter(|stored| stored.route.user_id == user_id)
            .map(|stored| stored.route.clone()))
    }

    async fn get_route_points(&self, route_id: Uuid) -> Result<Vec<RoutePoint>, AppError> {
        Ok(self
            .routes
            .read()
            .await
            .get(&route_id)
            .map(StoredRoute::ordered_points)
            .unwrap_or_default())
    }

    async fn append_points(&self, route_id: Uuid, points: &[GpsPoint]) -> Result<(), AppError> {
        let mut routes = self.routes.write().await;
        let stored = routes.get_mut(&route_id).ok_or(AppError::NotFound)?;
        if stored.route.status != RouteStatus::Recording {
            return Err(AppError::InvalidState(format!(
                "route {route_id} is {}, expected recording",
                stored.route.status
            )));
        }
        stored.points.extend(
            points
                .iter()
                .cloned()
                .map(|point| RoutePoint::new(route_id, point)),
        );
        Ok(())
    }

    async fn complete_route(
        &self,
        user_id: Uuid,
        route_id: Uuid,
        ended_at: OffsetDateTime,
    ) -> Result<RouteSummary, AppError> {
        // Appends wait on this write lock until the summary is applied.
        let mut routes = self.routes.write().await;
        let stored = routes
            .get_mut(&route_id)
            .filter(|stored| stored.route.user_id == user_id)
            .ok_or(AppError::NotFound)?;

        let points: Vec<GpsPoint> = stored
            .ordered_points()
            .into_iter()
            .map(|p| p.point)
            .collect();
        let summary = trip_summary::compute_summary(&stored.route, &points, ended_at)?;
        stored.route.apply_summary(&summary);
        Ok(summary)
    }

    async fn update_title(&self, user_id: Uuid, id: Uuid, title: &str) -> Result<bool, AppError> {
        let mut routes = self.routes.write().await;
        match routes.get_mut(&id) {
            Some(stored) if stored.route.user_id == user_id => {
                stored.route.title = Some(title.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_route(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut routes = self.routes.write().await;
        if routes
            .get(&id)
            .is_some_and(|stored| stored.route.user_id == user_id)
        {
            routes.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, OffsetDateTime, macros::datetime};

    const START: OffsetDateTime = datetime!(2026-03-01 08:00 UTC);

    #[tokio::test]
    async fn test_points_sorted_stably() {
        let store = MemoryStore::new();
        let route = Route::started_at(Uuid::new_v4(), START);
        store.create_route(&route).await.unwrap();

        let late = GpsPoint::new(35.0, 139.0, START + Duration::seconds(10));
        let tie_a = GpsPoint::new(35.1, 139.0, START + Duration::seconds(5));
        let tie_b = GpsPoint::new(35.2, 139.0, START + Duration::seconds(5));
        store
            .append_points(route.id, &[late.clone(), tie_a.clone(), tie_b.clone()])
            .await
            .unwrap();

        let points: Vec<GpsPoint> = store
            .get_route_points(route.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.point)
            .collect();
        assert_eq!(points, vec![tie_a, tie_b, late]);
    }

    fn track(first: i64, count: i64) -> Vec<GpsPoint> {
        (first..first + count)
            .map(|n| GpsPoint::new(35.0 + n as f64 * 0.001, 139.0, START + Duration::seconds(n)))
            .collect()
    }

    #[tokio::test]
    async fn test_complete_only_once() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let route = Route::started_at(owner, START);
        store.create_route(&route).await.unwrap();
        let ended_at = START + Duration::minutes(10);

        assert!(matches!(
            store.complete_route(Uuid::new_v4(), route.id, ended_at).await,
            Err(AppError::NotFound)
        ));
        let summary = store.complete_route(owner, route.id, ended_at).await.unwrap();
        assert_eq!(summary.duration_s, 600);
        assert!(matches!(
            store.complete_route(owner, route.id, ended_at).await,
            Err(AppError::InvalidState(_))
        ));

        let err = store
            .append_points(route.id, &[GpsPoint::new(35.0, 139.0, START)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(store.point_count(route.id).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_completion_counts_every_stored_point() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let route = Route::started_at(owner, START);
        let route_id = route.id;
        store.create_route(&route).await.unwrap();
        store.append_points(route_id, &track(0, 5)).await.unwrap();

        let appenders: Vec<_> = (1..=8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.append_points(route_id, &track(i * 10, 10)).await })
            })
            .collect();
        let summary = store
            .complete_route(owner, route_id, START + Duration::minutes(10))
            .await
            .unwrap();
        for appender in appenders {
            match appender.await.unwrap() {
                Ok(()) | Err(AppError::InvalidState(_)) => {}
                Err(e) => panic!("unexpected append error: {e}"),
            }
        }

        // Whatever made it into the route is exactly what the summary covers.
        let stored: Vec<GpsPoint> = store
            .get_route_points(route_id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.point)
            .collect();
        let recomputed =
            trip_summary::compute_summary(&Route::started_at(owner, START), &stored, summary.ended_at)
                .unwrap();
        assert_eq!(summary, recomputed);
        assert!(stored.len() >= 5);
    }

    #[tokio::test]
    async fn test_other_users_routes_are_invisible() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let route = Route::started_at(owner, START);
        store.create_route(&route).await.unwrap();

        assert!(store.get_route(stranger, route.id).await.unwrap().is_none());
        assert!(!store.update_title(stranger, route.id, "mine").await.unwrap());
        assert!(!store.delete_route(stranger, route.id).await.unwrap());
        assert!(store.get_route(owner, route.id).await.unwrap().is_some());
    }
}
