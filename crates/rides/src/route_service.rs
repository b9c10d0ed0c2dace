//! Route lifecycle operations shared by the HTTP handlers.
//!
//! Every operation is scoped to the calling user: a route owned by someone
//! else is reported as `NotFound`.

use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::AppError,
    models::{GpsPoint, Route},
    store::RouteStore,
    types::{
        BatchPointsRequest, BatchPointsResponse, CreateRouteResponse, ListRoutesQuery,
        RouteListResponse, RouteWithPoints, StopRouteResponse, UpdateTitleRequest,
        UpdateTitleResponse,
    },
};

pub async fn start_route(
    store: &dyn RouteStore,
    user_id: Uuid,
) -> Result<CreateRouteResponse, AppError> {
    let route = Route::new(user_id);
    store.create_route(&route).await?;

    tracing::info!(route_id = %route.id, %user_id, "Route recording started");

    Ok(CreateRouteResponse {
        id: route.id,
        status: route.status,
        started_at: route.started_at,
    })
}

pub async fn list_routes(
    store: &dyn RouteStore,
    user_id: Uuid,
    query: &ListRoutesQuery,
) -> Result<RouteListResponse, AppError> {
    query.validate()?;

    let mut data = store.list_routes(user_id, query, query.limit + 1).await?;
    let has_more = data.len() as i64 > query.limit;
    if has_more {
        data.truncate(query.limit as usize);
    }
    let next_cursor = if has_more {
        data.last().map(|route| route.started_at)
    } else {
        None
    };

    Ok(RouteListResponse { data, next_cursor })
}

pub async fn get_route(
    store: &dyn RouteStore,
    user_id: Uuid,
    route_id: Uuid,
) -> Result<RouteWithPoints, AppError> {
    let route = store
        .get_route(user_id, route_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let points = store.get_route_points(route_id).await?;

    Ok(RouteWithPoints { route, points })
}

/// Stores a batch of samples for a recording route.
///
/// The request is validated before the route is looked up. Samples whose
/// accuracy exceeds `accuracy_filter_m` are counted as received but not stored.
pub async fn append_points(
    store: &dyn RouteStore,
    user_id: Uuid,
    route_id: Uuid,
    request: BatchPointsRequest,
    accuracy_filter_m: f64,
) -> Result<BatchPointsResponse, AppError> {
    request.validate()?;

    let route = store
        .get_route(user_id, route_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !route.is_recording() {
        return Err(AppError::InvalidState(format!(
            "route {route_id} is {}, expected recording",
            route.status
        )));
    }

    let received = request.points.len();
    let kept: Vec<GpsPoint> = request
        .points
        .into_iter()
        .filter(|p| p.passes_accuracy_filter(accuracy_filter_m))
        .collect();

    if !kept.is_empty() {
        store.append_points(route_id, &kept).await?;
    }

    tracing::debug!(
        %route_id,
        received,
        stored = kept.len(),
        "Stored point batch"
    );

    Ok(BatchPointsResponse {
        received,
        stored: kept.len(),
    })
}

/// Stops a recording route, computing and freezing its summary.
///
/// The summary covers every point stored before the stop; batches arriving
/// later are refused. Fails with `InvalidState` without touching the route
/// when it is already completed, including when a concurrent stop commits
/// first.
pub async fn stop_route(
    store: &dyn RouteStore,
    user_id: Uuid,
    route_id: Uuid,
    ended_at: OffsetDateTime,
) -> Result<StopRouteResponse, AppError> {
    let summary = store.complete_route(user_id, route_id, ended_at).await?;

    tracing::info!(
        %route_id,
        distance_m = summary.distance_m,
        duration_s = summary.duration_s,
        "Route completed"
    );

    Ok(StopRouteResponse::new(route_id, &summary))
}

pub async fn update_title(
    store: &dyn RouteStore,
    user_id: Uuid,
    route_id: Uuid,
    request: UpdateTitleRequest,
) -> Result<UpdateTitleResponse, AppError> {
    request.validate()?;

    if !store.update_title(user_id, route_id, &request.title).await? {
        return Err(AppError::NotFound);
    }

    Ok(UpdateTitleResponse {
        id: route_id,
        title: request.title,
    })
}

pub async fn delete_route(
    store: &dyn RouteStore,
    user_id: Uuid,
    route_id: Uuid,
) -> Result<(), AppError> {
    if !store.delete_route(user_id, route_id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(%route_id, "Route deleted");
    Ok(())
}
