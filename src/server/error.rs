//! HTTP rendering of [`PdfForgeError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::PdfForgeError;

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for PdfForgeError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Full details only go to the log.
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        } else {
            warn!("Rejected request: {}", self);
        }

        let body = ErrorResponse {
            error: self.public_message(),
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}
