//! Request body types for API endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::GpsPoint;

/// Largest batch accepted by the upload endpoint.
pub const MAX_BATCH_POINTS: usize = 500;

/// Batch of samples uploaded for one route.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchPointsRequest {
    #[validate(
        length(min = 1, max = 500, message = "points must contain between 1 and 500 items"),
        nested
    )]
    pub points: Vec<GpsPoint>,
}

/// Route title update request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 100, message = "title must be between 1 and 100 characters"))]
    pub title: String,
}
