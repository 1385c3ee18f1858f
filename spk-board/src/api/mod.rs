//! REST API handlers for the status board

mod health;
mod sse;
mod status;

pub use health::health_check;
pub use sse::event_stream;
pub use status::{get_status_options, get_status_rows};
