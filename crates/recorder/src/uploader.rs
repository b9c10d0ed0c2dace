//! HTTP access to the rides API.
//!
//! [`ApiClient`] covers the calls a recording needs: start a route, upload
//! point batches, stop it. The session only depends on [`PointUploader`], so
//! tests can swap in a scripted uploader.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rides::{
    models::GpsPoint,
    types::{BatchPointsResponse, CreateRouteResponse, StopRouteResponse},
};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Delivers one batch of samples for a route.
#[async_trait]
pub trait PointUploader: Send + Sync {
    async fn upload(
        &self,
        route_id: Uuid,
        points: &[GpsPoint],
    ) -> Result<BatchPointsResponse, UploadError>;
}

/// Borrowing twin of `BatchPointsRequest`, so uploads don't clone the batch.
#[derive(Serialize)]
struct BatchBody<'a> {
    points: &'a [GpsPoint],
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url,
            token: config.token,
        }
    }

    /// Checks if the backend is reachable.
    pub async fn check_health(&self) -> Result<(), UploadError> {
        let url = format!("{}/health", self.base_url);
        let resp = self.client.get(&url).send().await?;
        ensure_success(resp).await?;
        Ok(())
    }

    /// Opens a new route in `recording` state.
    pub async fn create_route(&self) -> Result<CreateRouteResponse, UploadError> {
        let url = format!("{}/routes", self.base_url);
        let resp = self.client.post(&url).bearer_auth(&self.token).send().await?;
        Ok(ensure_success(resp).await?.json().await?)
    }

    /// Stops a route and returns the computed summary.
    pub async fn stop_route(&self, route_id: Uuid) -> Result<StopRouteResponse, UploadError> {
        let url = format!("{}/routes/{route_id}/stop", self.base_url);
        let resp = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(ensure_success(resp).await?.json().await?)
    }
}

#[async_trait]
impl PointUploader for ApiClient {
    async fn upload(
        &self,
        route_id: Uuid,
        points: &[GpsPoint],
    ) -> Result<BatchPointsResponse, UploadError> {
        let url = format!("{}/routes/{route_id}/points", self.base_url);
        let request_id = Uuid::new_v4();

        debug!(%route_id, %request_id, points = points.len(), "Uploading point batch");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("x-request-id", request_id.to_string())
            .json(&BatchBody { points })
            .send()
            .await?;

        Ok(ensure_success(resp).await?.json().await?)
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, UploadError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(UploadError::Status { status, body })
}
