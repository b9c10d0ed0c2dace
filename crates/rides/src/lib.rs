pub mod auth;
pub mod config;
pub mod database;
pub mod distance;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod query_builder;
pub mod request_id;
pub mod route_service;
pub mod store;
pub mod trip_summary;
pub mod types;

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, patch, post},
};
use sqlx::postgres::PgPoolOptions;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
};

use crate::{
    auth::AuthKeys,
    config::ServerConfig,
    database::Database,
    handlers::{
        append_points, create_route, delete_route, get_route, health_check, list_routes,
        stop_route, update_title,
    },
    request_id::request_id_middleware,
    store::{MemoryStore, SharedStore},
};

pub fn create_router(store: SharedStore, config: ServerConfig) -> Router {
    let keys = AuthKeys::from_secret(config.jwt_secret.as_bytes());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/routes", get(list_routes).post(create_route))
        .route(
            "/routes/{id}",
            get(get_route).patch(update_title).delete(delete_route),
        )
        .route("/routes/{id}/stop", patch(stop_route))
        .route("/routes/{id}/points", post(append_points))
        .layer(Extension(store))
        .layer(Extension(keys))
        .layer(Extension(Arc::new(config)))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(CompressionLayer::new())
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Picks PostgreSQL when a database URL is configured, otherwise an in-memory store.
pub async fn connect_store(config: &ServerConfig) -> anyhow::Result<SharedStore> {
    match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database");
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Ok(Arc::new(Database::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, routes are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let store = connect_store(&config).await?;
    let port = config.port;
    let app = create_router(store, config);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!("Server running on http://0.0.0.0:{port}");

    axum::serve(listener, app).await?;

    Ok(())
}
