//! HTTP mapping for service errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use slotline_domain::SlotlineError;
use tracing::error;

/// Error returned by route handlers.
#[derive(Debug)]
pub struct ApiError(pub SlotlineError);

impl From<SlotlineError> for ApiError {
    fn from(err: SlotlineError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self(SlotlineError::Auth(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SlotlineError::Validation { .. } | SlotlineError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            SlotlineError::NeedsReconnect(_) | SlotlineError::Auth(_) => StatusCode::UNAUTHORIZED,
            SlotlineError::NotFound(_) => StatusCode::NOT_FOUND,
            SlotlineError::Network(_) | SlotlineError::Timeout(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            SlotlineError::Validation { field, message } => {
                json!({ "error": self.0.to_string(), "field": field, "message": message })
            }
            SlotlineError::NeedsReconnect(provider) => json!({
                "error": self.0.to_string(),
                "needsReconnect": true,
                "provider": provider,
            }),
            SlotlineError::InvalidInput(_) | SlotlineError::Auth(_) | SlotlineError::NotFound(_) => {
                json!({ "error": self.0.to_string() })
            }
            SlotlineError::Network(_) | SlotlineError::Timeout(_) => {
                json!({ "error": "upstream provider unavailable" })
            }
            other => {
                error!(error = %other, "request failed");
                json!({ "error": "internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}
