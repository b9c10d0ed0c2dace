//! Route recording handlers.
//!
//! Extractors are wrapped in [`WithRejection`] so undecodable paths, queries
//! and bodies answer with the regular `VALIDATION_ERROR` envelope.

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    config::ServerConfig,
    errors::AppError,
    route_service,
    store::SharedStore,
    types::{
        BatchPointsRequest, BatchPointsResponse, CreateRouteResponse, DeleteRouteResponse,
        ListRoutesQuery, RouteListResponse, RouteWithPoints, StopRouteResponse,
        UpdateTitleRequest, UpdateTitleResponse,
    },
};

/// Start recording a new route.
pub async fn create_route(
    Extension(store): Extension<SharedStore>,
    AuthUser(claims): AuthUser,
) -> Result<(StatusCode, Json<CreateRouteResponse>), AppError> {
    let created = route_service::start_route(store.as_ref(), claims.sub).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List the caller's routes, newest first.
pub async fn list_routes(
    Extension(store): Extension<SharedStore>,
    AuthUser(claims): AuthUser,
    WithRejection(Query(query), _): WithRejection<Query<ListRoutesQuery>, AppError>,
) -> Result<Json<RouteListResponse>, AppError> {
    let page = route_service::list_routes(store.as_ref(), claims.sub, &query).await?;
    Ok(Json(page))
}

/// Get a route with all of its points.
pub async fn get_route(
    Extension(store): Extension<SharedStore>,
    AuthUser(claims): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<RouteWithPoints>, AppError> {
    let route = route_service::get_route(store.as_ref(), claims.sub, id).await?;
    Ok(Json(route))
}

/// Upload a batch of GPS points for a recording route.
pub async fn append_points(
    Extension(store): Extension<SharedStore>,
    Extension(config): Extension<Arc<ServerConfig>>,
    AuthUser(claims): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<BatchPointsRequest>, AppError>,
) -> Result<Json<BatchPointsResponse>, AppError> {
    let response = route_service::append_points(
        store.as_ref(),
        claims.sub,
        id,
        request,
        config.accuracy_filter_m,
    )
    .await?;
    Ok(Json(response))
}

/// Stop recording and compute the trip summary.
pub async fn stop_route(
    Extension(store): Extension<SharedStore>,
    AuthUser(claims): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<StopRouteResponse>, AppError> {
    let stopped =
        route_service::stop_route(store.as_ref(), claims.sub, id, OffsetDateTime::now_utc())
            .await?;
    Ok(Json(stopped))
}

/// Rename a route.
pub async fn update_title(
    Extension(store): Extension<SharedStore>,
    AuthUser(claims): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateTitleRequest>, AppError>,
) -> Result<Json<UpdateTitleResponse>, AppError> {
    let updated = route_service::update_title(store.as_ref(), claims.sub, id, request).await?;
    Ok(Json(updated))
}

/// Delete a route and its points.
pub async fn delete_route(
    Extension(store): Extension<SharedStore>,
    AuthUser(claims): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<DeleteRouteResponse>, AppError> {
    route_service::delete_route(store.as_ref(), claims.sub, id).await?;
    Ok(Json(DeleteRouteResponse { deleted: true }))
}
