//! Replays a recorded ride against a running rides API.
//!
//! Run with:
//! ```
//! RIDES_API_URL=http://localhost:3001 RIDES_API_TOKEN=... \
//!     cargo run -p recorder --bin replay -- ride.ndjson
//! ```
//!
//! The input holds one JSON GpsPoint per line. Without `RIDES_API_TOKEN` a
//! token for a fresh user is signed with `JWT_SECRET`.

use std::{env, sync::Arc};

use anyhow::{Context, bail};
use recorder::{ApiClient, ApiConfig, GpsPoint, Tracker, TrackerConfig};
use rides::auth::{AuthKeys, create_token};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn read_points(path: &str) -> anyhow::Result<Vec<GpsPoint>> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("{path}:{}: invalid point", i + 1))
        })
        .collect()
}

fn api_config() -> anyhow::Result<ApiConfig> {
    if let Some(config) = ApiConfig::from_env() {
        return Ok(config);
    }

    let Ok(secret) = env::var("JWT_SECRET") else {
        bail!("set RIDES_API_TOKEN, or JWT_SECRET to sign a token");
    };
    let user_id = Uuid::new_v4();
    let token = create_token(&AuthKeys::from_secret(secret.as_bytes()), user_id)
        .context("signing token")?;
    tracing::info!(%user_id, "Signed a token for a new user");

    let base_url = env::var("RIDES_API_URL").unwrap_or_else(|_| "http://localhost:3001".into());
    Ok(ApiConfig::new(base_url, token))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(path) = env::args().nth(1) else {
        bail!("usage: replay <points.ndjson>");
    };
    let points = read_points(&path)?;
    tracing::info!("Loaded {} points from {path}", points.len());

    let client = Arc::new(ApiClient::new(api_config()?));
    client
        .check_health()
        .await
        .context("rides API not reachable")?;

    let route = client.create_route().await?;
    tracing::info!(route_id = %route.id, "Route created");

    let mut tracker = Tracker::new(Arc::clone(&client), TrackerConfig::from_env());
    tracker.start(route.id)?;
    for point in points {
        tracker.record(point).await?;
    }
    let report = tracker.stop().await?;
    if report.lost_points > 0 {
        tracing::warn!("{} points could not be uploaded", report.lost_points);
    }

    let summary = client.stop_route(route.id).await?;

    // Summary output
    tracing::info!("Replay completed!");
    tracing::info!("  Uploaded: {} ({} stored)", report.uploaded_points, report.stored_points);
    tracing::info!("  Distance: {} m", summary.distance_m);
    tracing::info!("  Duration: {} s", summary.duration_s);
    tracing::info!("  Avg speed: {} km/h", summary.avg_speed_kmh);
    tracing::info!("  Max speed: {} km/h", summary.max_speed_kmh);

    Ok(())
}
