//! HTTP mapping for service errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

/// Wrapper turning [`spk_common::Error`] into an HTTP response
#[derive(Debug)]
pub struct ApiError(pub spk_common::Error);

impl From<spk_common::Error> for ApiError {
    fn from(e: spk_common::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use spk_common::Error;

        let (status, message) = match &self.0 {
            Error::NotFound(what) => (StatusCode::NOT_FOUND, format!("not found: {what}")),
            Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            other => {
                error!("request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
