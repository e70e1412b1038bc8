use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// `axum`-compatible error handler.
///
/// Every failure is rendered as `{"message": ..., "errors": [...]}`.
#[derive(Error)]
pub struct Error {
    status: StatusCode,
    err: anyhow::Error,
    fields: Vec<FieldError>,
}

#[derive(Serialize)]
struct Envelope {
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl Error {
    pub fn with_status(status: StatusCode, err: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            err: err.into(),
            fields: Vec::new(),
        }
    }

    /// Malformed or out-of-range input.
    pub fn validation(fields: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            err: anyhow::anyhow!("Validation error"),
            fields,
        }
    }

    /// Bad input that is not attributable to a single form field.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    /// Missing, unknown or expired bearer token.
    pub fn unauthenticated() -> Self {
        Self::with_status(
            StatusCode::UNAUTHORIZED,
            anyhow::anyhow!("Authentication required"),
        )
    }

    /// Valid session, insufficient role.
    pub fn forbidden() -> Self {
        Self::with_status(StatusCode::FORBIDDEN, anyhow::anyhow!("Access denied"))
    }

    pub fn not_found(what: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!("{what} not found"))
    }

    /// Uniqueness violation (e.g. an already registered email).
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.fields
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            err,
            fields: Vec::new(),
        }
    }
}

/// Extractor rejections keep their status, except that undecodable bodies are
/// reported as plain validation failures (400) rather than 422.
macro_rules! from_rejection {
    ($($rejection:ty),* $(,)?) => {
        $(
            impl From<$rejection> for Error {
                fn from(rejection: $rejection) -> Self {
                    let status = match rejection.status() {
                        StatusCode::UNPROCESSABLE_ENTITY => StatusCode::BAD_REQUEST,
                        status => status,
                    };
                    Self::with_status(status, anyhow::anyhow!(rejection.body_text()))
                }
            }
        )*
    };
}

from_rejection!(JsonRejection, PathRejection, QueryRejection, MultipartRejection);

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.status, self.err)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.err.fmt(f)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // N.B: Server-side failures are logged in full but only a generic message is
        // returned; the underlying error chain may contain SQL or filesystem detail.
        let message = if self.status.is_server_error() {
            error!("{:?}", self.err);
            "internal server error".to_owned()
        } else {
            debug!(status = %self.status, "request rejected: {}", self.err);
            self.err.to_string()
        };

        let body = Envelope {
            message,
            errors: self.fields,
        };
        (self.status, Json(body)).into_response()
    }
}
