//! Error bridge between domain errors and HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mintpass_core::Error;
use serde::Serialize;
use std::fmt;

use crate::validate::FieldError;

/// Application error type for web handlers.
///
/// Wraps domain and internal errors with an HTTP status, a stable error
/// code for clients, and a user-facing message. Internal details are
/// logged, never exposed.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    field_errors: Vec<FieldError>,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create an error with an explicit status and code.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            field_errors: Vec::new(),
            source: None,
        }
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 403 Forbidden.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// 422 Unprocessable Entity with a structured field-error list.
    #[must_use]
    pub fn validation(errors: Vec<FieldError>) -> Self {
        let mut err = Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "VALIDATION_ERROR",
            "request validation failed",
        );
        err.field_errors = errors;
        err
    }

    /// 500 Internal Server Error with a logged source.
    #[must_use]
    pub fn internal(source: anyhow::Error) -> Self {
        let mut err = Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "an internal error occurred",
        );
        err.source = Some(source);
        err
    }

    /// The HTTP status (for tests).
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Map core errors onto HTTP semantics: domain errors become client
/// errors carrying their reason; everything else is an opaque 500.
impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
            }
            Error::RefundAlreadyProcessed => {
                Self::new(StatusCode::CONFLICT, "ALREADY_REFUNDED", err.to_string())
            }
            ref domain if domain.is_domain() => {
                Self::new(StatusCode::BAD_REQUEST, "DOMAIN_ERROR", err.to_string())
            }
            internal => Self::internal(internal.into()),
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Stable error code for client branching.
    code: &'static str,
    /// Human-readable message.
    message: String,
    /// Field errors, present for validation failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "internal server error"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            errors: self.field_errors,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_bad_request() {
        let err = AppError::from(Error::domain("event is full"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "[DOMAIN_ERROR] event is full");
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::from(Error::NotFound {
            entity: "event",
            key: "7".to_string(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn double_refund_maps_to_conflict() {
        let err = AppError::from(Error::RefundAlreadyProcessed);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::from(Error::OutOfSync("claims exceed tokens".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("claims exceed tokens"));
    }
}
