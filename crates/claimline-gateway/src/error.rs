// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of queue errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use claimline_core::{ClaimlineError, ErrorKind};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error classification.
    pub kind: ErrorKind,
    /// Error description.
    pub error: String,
    /// Whether the same request may be sent again unchanged.
    pub retryable: bool,
}

/// A [`ClaimlineError`] returned from a handler.
#[derive(Debug)]
pub struct ApiError(pub ClaimlineError);

impl From<ClaimlineError> for ApiError {
    fn from(e: ClaimlineError) -> Self {
        Self(e)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicateActiveClaim | ErrorKind::InvalidTransition => StatusCode::CONFLICT,
        ErrorKind::InvalidPosition | ErrorKind::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ConcurrencyConflict => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Cancelled => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::ExternalDependencyFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!(error = %self.0, %kind, "request failed");
        } else if kind == ErrorKind::Cancelled {
            warn!("request cancelled before commit");
        }
        let body = ErrorResponse {
            kind,
            // Storage and internal details stay in the log.
            error: if kind == ErrorKind::Internal {
                "internal error".to_string()
            } else {
                self.0.to_string()
            },
            retryable: self.0.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimline_core::ClaimStatus;

    #[test]
    fn invalid_requests_and_retries_map_distinctly() {
        let cases = [
            (ClaimlineError::ClaimNotFound("c".into()), StatusCode::NOT_FOUND),
            (ClaimlineError::ItemNotFound("i".into()), StatusCode::NOT_FOUND),
            (
                ClaimlineError::DuplicateActiveClaim {
                    item_id: "i".into(),
                    user_id: "u".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                ClaimlineError::InvalidTransition {
                    from: ClaimStatus::Completed,
                    to: ClaimStatus::Pending,
                },
                StatusCode::CONFLICT,
            ),
            (
                ClaimlineError::InvalidPosition {
                    requested: 9,
                    detail: "x".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ClaimlineError::ConcurrencyConflict("busy".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ClaimlineError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).into_response().status(), expected);
        }
    }

    #[test]
    fn error_response_serializes_kind_in_snake_case() {
        let body = ErrorResponse {
            kind: ErrorKind::DuplicateActiveClaim,
            error: "dup".into(),
            retryable: false,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"kind\":\"duplicate_active_claim\""));
        assert!(json.contains("\"retryable\":false"));
    }
}
