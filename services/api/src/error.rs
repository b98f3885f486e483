//! services/api/src/error.rs
//!
//! Defines the primary error type for the service, and the HTTP mapping of
//! core errors returned by the handlers.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use post_planner_core::ports::{CoreError, ErrorKind};
use serde::Serialize;
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The body of every failed request: one message plus its kind.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(value_type = String, example = "ROLLBACK")]
    pub kind: ErrorKind,
    pub message: String,
}

/// A `CoreError` on its way out of a handler.
#[derive(Debug)]
pub struct HandlerError(pub CoreError);

impl From<CoreError> for HandlerError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl HandlerError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self(CoreError::new(ErrorKind::Rejected, message))
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Rejected | ErrorKind::Rollback => StatusCode::CONFLICT,
        ErrorKind::NetworkFailure => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ServerFailure
        | ErrorKind::MalformedResponse
        | ErrorKind::UnexpectedShape
        | ErrorKind::MissingField => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let HandlerError(err) = self;
        let body = ErrorBody {
            kind: err.kind,
            message: err.message,
        };
        (status_for(err.kind), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_kinds_to_statuses() {
        assert_eq!(status_for(ErrorKind::Rejected), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Rollback), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::NetworkFailure),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_for(ErrorKind::MissingField), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn startup_failures_convert_into_api_errors() {
        let config: ApiError = ConfigError::MissingVar("CALENDAR_WEBHOOK_URL".to_string()).into();
        assert!(matches!(config, ApiError::Config(_)));
        assert!(config.to_string().contains("CALENDAR_WEBHOOK_URL"));

        let io: ApiError = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken").into();
        assert!(matches!(io, ApiError::Io(_)));
    }

    #[test]
    fn error_body_uses_screaming_kind_names() {
        let body = ErrorBody {
            kind: ErrorKind::MalformedResponse,
            message: "bad".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["kind"], "MALFORMED_RESPONSE");
    }
}
