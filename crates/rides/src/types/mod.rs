//! Request, response, and query types used by API handlers.
//!
//! These are the wire contract shared with the recorder client.

mod queries;
mod requests;
mod responses;

pub use queries::*;
pub use requests::*;
pub use responses::*;
