//! Query parameter types for API endpoints.

use serde::Deserialize;
use time::OffsetDateTime;
use validator::Validate;

/// Default page size for route listings.
pub fn default_limit() -> i64 {
    20
}

/// Route listing query parameters.
///
/// `cursor` is the `startedAt` of the last route on the previous page.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListRoutesQuery {
    /// Earliest start time (inclusive)
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub from: Option<OffsetDateTime>,
    /// Latest start time (inclusive)
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub to: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub cursor: Option<OffsetDateTime>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
}

impl Default for ListRoutesQuery {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            cursor: None,
            limit: default_limit(),
        }
    }
}
