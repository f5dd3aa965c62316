//! # ApiError
//!
//! Maps domain failures onto HTTP status codes with a JSON envelope:
//! `{"error": {"code", "message", "retryable"}}`.

use domains::DomainError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Query string or path segment that could not be parsed
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Body that is not valid JSON or does not fit the expected shape
    #[error("malformed request body: {message}")]
    MalformedBody { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Domain(e) => domain_status(e),
            Self::BadRequest(_) => 400,
            Self::MalformedBody { status, .. } => *status,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            Self::Domain(e) => domain_body(e),
            Self::BadRequest(m) => ErrorBody {
                code: "bad_request",
                message: m.clone(),
                retryable: false,
            },
            Self::MalformedBody { message, .. } => ErrorBody {
                code: "malformed_body",
                message: message.clone(),
                retryable: false,
            },
        }
    }
}

pub fn domain_status(e: &DomainError) -> u16 {
    match e {
        DomainError::Unauthenticated => 401,
        DomainError::Forbidden(_) => 403,
        DomainError::NotFound(..) => 404,
        DomainError::ValidationFailed(_) => 400,
        DomainError::Conflict(_) => 409,
        DomainError::TransientStore(_) => 503,
        DomainError::Internal(_) => 500,
    }
}

/// Internal details stay in the logs.
pub fn domain_body(e: &DomainError) -> ErrorBody {
    let (code, message) = match e {
        DomainError::Unauthenticated => ("unauthenticated", e.to_string()),
        DomainError::Forbidden(_) => ("forbidden", e.to_string()),
        DomainError::NotFound(..) => ("not_found", e.to_string()),
        DomainError::ValidationFailed(_) => ("validation_failed", e.to_string()),
        DomainError::Conflict(_) => ("conflict", e.to_string()),
        DomainError::TransientStore(_) => (
            "temporarily_unavailable",
            "the data store is temporarily unavailable, please retry".to_string(),
        ),
        DomainError::Internal(_) => ("internal", "internal server error".to_string()),
    };
    ErrorBody {
        code,
        message,
        retryable: e.is_retryable(),
    }
}

#[cfg(feature = "web-axum")]
mod axum_impl {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use tracing::{error, warn};

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            let status =
                StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                error!(error = %self, status = status.as_u16(), "request failed");
            } else {
                warn!(error = %self, status = status.as_u16(), "request rejected");
            }
            (status, Json(ErrorEnvelope { error: self.body() })).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DomainError::Unauthenticated, 401),
            (DomainError::Forbidden("x".into()), 403),
            (DomainError::not_found("Idea", 1), 404),
            (DomainError::validation("x"), 400),
            (DomainError::Conflict("x".into()), 409),
            (DomainError::TransientStore("x".into()), 503),
            (DomainError::Internal("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_internal_detail_is_not_leaked() {
        let body = domain_body(&DomainError::Internal("password=hunter2".into()));
        assert!(!body.message.contains("hunter2"));
        assert!(!body.retryable);
    }

    #[test]
    fn test_transient_is_flagged_retryable() {
        let body = domain_body(&DomainError::TransientStore("reset".into()));
        assert_eq!(body.code, "temporarily_unavailable");
        assert!(body.retryable);
    }
}
