use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::{GpsPoint, Route, RoutePoint, RouteStatus, RouteSummary},
    query_builder::QueryBuilder,
    store::RouteStore,
    trip_summary,
    types::ListRoutesQuery,
};

const ROUTE_COLUMNS: &str = "id, user_id, title, status, started_at, ended_at, \
     distance_m, duration_s, avg_speed_kmh, max_speed_kmh, created_at";

/// Rows per INSERT statement when storing a batch of points.
const INSERT_CHUNK: usize = 100;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RouteStore for Database {
    async fn create_route(&self, route: &Route) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO routes (id, user_id, title, status, started_at, ended_at,
                                distance_m, duration_s, avg_speed_kmh, max_speed_kmh,
                                created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(route.id)
        .bind(route.user_id)
        .bind(&route.title)
        .bind(route.status)
        .bind(route.started_at)
        .bind(route.ended_at)
        .bind(route.distance_m)
        .bind(route.duration_s)
        .bind(route.avg_speed_kmh)
        .bind(route.max_speed_kmh)
        .bind(route.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_routes(
        &self,
        user_id: Uuid,
        query: &ListRoutesQuery,
        fetch: i64,
    ) -> Result<Vec<Route>, AppError> {
        let mut qb = QueryBuilder::new();
        qb.add_param_condition("user_id = ");
        qb.add_optional(&query.from, |idx| format!("started_at >= ${idx}"));
        qb.add_optional(&query.to, |idx| format!("started_at <= ${idx}"));
        qb.add_optional(&query.cursor, |idx| format!("started_at < ${idx}"));
        let limit_idx = qb.next_param_idx();

        let sql = format!(
            "SELECT {ROUTE_COLUMNS} FROM routes WHERE {} ORDER BY started_at DESC LIMIT ${limit_idx}",
            qb.build_where()
        );

        let mut q = sqlx::query_as::<_, Route>(&sql).bind(user_id);
        for bound in [query.from, query.to, query.cursor].into_iter().flatten() {
            q = q.bind(bound);
        }
        let routes = q.bind(fetch).fetch_all(&self.pool).await?;

        Ok(routes)
    }

    async fn get_route(&self, user_id: Uuid, id: Uuid) -> Result<Option<Route>, AppError> {
        let route = sqlx::query_as(&format!(
            "SELECT {ROUTE_COLUMNS} FROM routes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(route)
    }

    async fn get_route_points(&self, route_id: Uuid) -> Result<Vec<RoutePoint>, AppError> {
        let points = sqlx::query_as(
            r#"
            SELECT id, route_id, latitude, longitude, altitude, speed, heading,
                   accuracy, recorded_at
            FROM route_points
            WHERE route_id = $1
            ORDER BY recorded_at ASC, seq ASC
            "#,
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(points)
    }

    async fn append_points(&self, route_id: Uuid, points: &[GpsPoint]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock keeps a concurrent stop from completing the route mid-batch.
        let status: Option<RouteStatus> =
            sqlx::query_scalar("SELECT status FROM routes WHERE id = $1 FOR UPDATE")
                .bind(route_id)
                .fetch_optional(&mut *tx)
                .await?;

        match status {
            None => return Err(AppError::NotFound),
            Some(RouteStatus::Completed) => {
                return Err(AppError::InvalidState(format!(
                    "route {route_id} is completed, expected recording"
                )));
            }
            Some(RouteStatus::Recording) => {}
        }

        for chunk in points.chunks(INSERT_CHUNK) {
            let mut insert = sqlx::QueryBuilder::<Postgres>::new(
                "INSERT INTO route_points (id, route_id, latitude, longitude, altitude, \
                 speed, heading, accuracy, recorded_at) ",
            );
            insert.push_values(chunk, |mut row, point| {
                row.push_bind(Uuid::new_v4())
                    .push_bind(route_id)
                    .push_bind(point.latitude)
                    .push_bind(point.longitude)
                    .push_bind(point.altitude)
                    .push_bind(point.speed)
                    .push_bind(point.heading)
                    .push_bind(point.accuracy)
                    .push_bind(point.recorded_at);
            });
            insert.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn complete_route(
        &self,
        user_id: Uuid,
        route_id: Uuid,
        ended_at: OffsetDateTime,
    ) -> Result<RouteSummary, AppError> {
        let mut tx = self.pool.begin().await?;

        // Same row lock as append_points: the point set cannot change until commit.
        let route: Route = sqlx::query_as(&format!(
            "SELECT {ROUTE_COLUMNS} FROM routes WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(route_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound)?;

        let points: Vec<GpsPoint> = sqlx::query_as(
            r#"
            SELECT latitude, longitude, altitude, speed, heading, accuracy, recorded_at
            FROM route_points
            WHERE route_id = $1
            ORDER BY recorded_at ASC, seq ASC
            "#,
        )
        .bind(route_id)
        .fetch_all(&mut *tx)
        .await?;

        let summary = trip_summary::compute_summary(&route, &points, ended_at)?;

        sqlx::query(
            r#"
            UPDATE routes
            SET status = 'completed',
                ended_at = $2,
                distance_m = $3,
                duration_s = $4,
                avg_speed_kmh = $5,
                max_speed_kmh = $6
            WHERE id = $1
            "#,
        )
        .bind(route_id)
        .bind(summary.ended_at)
        .bind(summary.distance_m)
        .bind(summary.duration_s)
        .bind(summary.avg_speed_kmh)
        .bind(summary.max_speed_kmh)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(summary)
    }

    async fn update_title(&self, user_id: Uuid, id: Uuid, title: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE routes SET title = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .bind(title)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_route(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let owned: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM routes WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if owned.is_none() {
            return Ok(false);
        }

        sqlx::query("DELETE FROM route_points WHERE route_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
