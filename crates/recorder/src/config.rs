//! Configuration for recording sessions and the API client.

use std::{env, time::Duration};

use rides::{models::ACCURACY_FILTER_M, types::MAX_BATCH_POINTS};

const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_MAX_BATCH_POINTS: usize = 50;
const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// Buffering policy of a tracking session.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Period of the background flush.
    pub flush_interval: Duration,
    /// Buffer length that triggers an immediate flush.
    pub max_batch_points: usize,
    /// Samples reporting a worse accuracy than this (meters) are discarded.
    pub accuracy_filter_m: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_batch_points: DEFAULT_MAX_BATCH_POINTS,
            accuracy_filter_m: ACCURACY_FILTER_M,
        }
    }
}

impl TrackerConfig {
    /// Reads `FLUSH_INTERVAL_SECS`, `MAX_BATCH_POINTS` and `ACCURACY_FILTER_M`.
    ///
    /// A batch size the server would refuse falls back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            flush_interval: parse_var("FLUSH_INTERVAL_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.flush_interval),
            max_batch_points: parse_var("MAX_BATCH_POINTS")
                .filter(|n: &usize| (1..=MAX_BATCH_POINTS).contains(n))
                .unwrap_or(defaults.max_batch_points),
            accuracy_filter_m: parse_var("ACCURACY_FILTER_M").unwrap_or(defaults.accuracy_filter_m),
        }
    }
}

/// Where the rides API lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token sent with every request.
    pub token: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Reads `RIDES_API_URL` (default `http://localhost:3001`) and `RIDES_API_TOKEN`.
    ///
    /// Returns `None` when no token is configured.
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("RIDES_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let token = env::var("RIDES_API_TOKEN").ok().filter(|t| !t.is_empty())?;
        Some(Self::new(base_url, token))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {name}={raw}");
            None
        }
    }
}
