use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// JSON body returned when a request is not handed to a route handler.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: StatusCode) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            code: status.as_u16(),
        }
    }

    pub fn rate_limited() -> Self {
        Self::new(
            "rate_limit_exceeded",
            "Rate limit exceeded",
            StatusCode::TOO_MANY_REQUESTS,
        )
    }

    pub fn not_matched() -> Self {
        Self::new(
            "method_not_allowed",
            "Method Not Allowed",
            StatusCode::METHOD_NOT_ALLOWED,
        )
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
