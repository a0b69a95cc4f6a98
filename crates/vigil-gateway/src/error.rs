// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error-to-response mapping for the REST surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use vigil_core::VigilError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Wrapper turning a [`VigilError`] into an HTTP response.
///
/// Caller-correctable errors map to 4xx and are never retried server-side;
/// everything else is a 500 with the detail kept out of the body.
#[derive(Debug)]
pub struct ApiError(pub VigilError);

impl From<VigilError> for ApiError {
    fn from(e: VigilError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            VigilError::NotFound { .. } => (StatusCode::NOT_FOUND, self.0.to_string()),
            VigilError::InvalidTransition { .. } | VigilError::Conflict { .. } => {
                (StatusCode::CONFLICT, self.0.to_string())
            }
            VigilError::Validation(_) | VigilError::Configuration(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            other => {
                tracing::error!(error = %other, "internal error handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::types::IncidentStatus;

    fn status_of(err: VigilError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            status_of(VigilError::NotFound { id: "x".into() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(VigilError::Conflict { id: "x".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(VigilError::InvalidTransition {
                from: IncidentStatus::Open,
                to: IncidentStatus::Closed,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(VigilError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(VigilError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let response = ApiError(VigilError::Internal("secret path /etc/x".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Body carries only the generic message; the detail goes to logs.
    }
}
