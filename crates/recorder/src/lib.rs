//! Ride recording client for the rides API.
//!
//! A [`Tracker`] records one route at a time. Samples are validated, filtered
//! by reported accuracy and buffered; the buffer is uploaded every flush
//! interval or as soon as it reaches the batch size, split into batches the
//! server accepts. A batch that fails to upload goes back to the front of the
//! buffer, with everything behind it, and is retried with the next flush.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use recorder::prelude::*;
//!
//! let client = Arc::new(ApiClient::new(ApiConfig::new("http://localhost:3001", token)));
//! let route = client.create_route().await?;
//!
//! let mut tracker = Tracker::new(client.clone(), TrackerConfig::default());
//! tracker.start(route.id)?;
//! tracker.record(sample).await?;
//! let report = tracker.stop().await?;
//! let summary = client.stop_route(route.id).await?;
//! ```

pub mod buffer;
pub mod config;
pub mod session;
pub mod stats;
pub mod uploader;

pub use buffer::{Admission, PointBuffer};
pub use config::{ApiConfig, TrackerConfig};
pub use session::{SessionReport, Tracker, TrackerError};
pub use stats::LiveStats;
pub use uploader::{ApiClient, PointUploader, UploadError};

// Re-export the wire types shared with the server
pub use rides::models::GpsPoint;
pub use rides::types::{BatchPointsResponse, CreateRouteResponse, StopRouteResponse};

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::{
        ApiClient, ApiConfig, GpsPoint, LiveStats, PointUploader, SessionReport, Tracker,
        TrackerConfig, TrackerError,
    };
    pub use std::sync::Arc;
}
