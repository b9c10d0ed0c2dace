//! Server configuration read from the environment.

use std::env;

use crate::models::ACCURACY_FILTER_M;

const DEFAULT_PORT: u16 = 3001;
const DEV_JWT_SECRET: &str = "ride-tracker-dev-secret-change-in-production";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PostgreSQL connection string. Without one the server keeps routes in memory.
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    /// Points reporting a worse accuracy than this (meters) are not stored.
    pub accuracy_filter_m: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            port: DEFAULT_PORT,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            accuracy_filter_m: ACCURACY_FILTER_M,
        }
    }
}

impl ServerConfig {
    /// Reads `DATABASE_URL`, `PORT`, `JWT_SECRET` and `ACCURACY_FILTER_M`.
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using the development secret");
            defaults.jwt_secret.clone()
        });

        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            port: parse_var("PORT").unwrap_or(defaults.port),
            jwt_secret,
            accuracy_filter_m: parse_var("ACCURACY_FILTER_M").unwrap_or(defaults.accuracy_filter_m),
        }
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
