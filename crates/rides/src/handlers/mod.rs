//! HTTP request handlers for the rides API.

pub mod health;
pub mod routes;

pub use health::health_check;
pub use routes::{
    append_points, create_route, delete_route, get_route, list_routes, stop_route, update_title,
};
