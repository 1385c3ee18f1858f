//! REST API handlers for the division service

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{
    complete_stage, event_stream, finish_design, get_design_queue, health_check, set_queue_status,
    submit_intake,
};
