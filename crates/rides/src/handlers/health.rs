//! Liveness endpoint.

use axum::response::Json;

use crate::types::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
