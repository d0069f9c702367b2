//! Response bodies shared by every endpoint.
//!
//! Successful responses are the payload itself; failures use [`ErrorBody`].

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error payload: `{"error": <message>, "code": <status>}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
    /// HTTP status code, repeated in the body.
    pub code: u16,
}

impl ErrorBody {
    /// Creates an error body for the given status.
    pub fn new(error: impl Into<String>, status: StatusCode) -> Self {
        Self {
            error: error.into(),
            code: status.as_u16(),
        }
    }
}

/// Turns a handler panic into a 500 carrying the panic message.
///
/// Plugged into `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Internal server error".to_string()
    };
    tracing::error!(error = %message, "handler panicked");

    let status = StatusCode::INTERNAL_SERVER_ERROR;
    (status, Json(ErrorBody::new(message, status))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_code_matches_status() {
        let body = ErrorBody::new("Endpoint not found", StatusCode::NOT_FOUND);
        assert_eq!(body.code, 404);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Endpoint not found", "code": 404}));
    }

    #[test]
    fn test_panic_response_status() {
        let response = panic_response(Box::new("worker exploded"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = panic_response(Box::new(String::from("owned message")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
