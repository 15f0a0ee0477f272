//! Error and status vocabulary shared by the pipeline, router and handlers.
//!
//! Every variant maps to exactly one status code; [`ApiError::into_response`]
//! is the only place an error becomes bytes-to-be.

use thiserror::Error;

use crate::http::parser::ParseError;
use crate::http::request::Method;
use crate::http::response::{Response, StatusCode};
use crate::library::LibraryError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Malformed request, body or missing field.
    #[error("{0}")]
    BadRequest(String),

    /// Automation disabled or the library refused the operation.
    #[error("{0}")]
    Forbidden(String),

    /// No route matched.
    #[error("Unknown endpoint: {method} {path}")]
    RouteNotFound { method: Method, path: String },

    /// A referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn disabled() -> Self {
        ApiError::Forbidden("Automation API is disabled".into())
    }

    pub fn missing_field(name: &str) -> Self {
        ApiError::BadRequest(format!("Missing field: {}", name))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BadRequest,
            ApiError::Forbidden(_) => StatusCode::Forbidden,
            ApiError::RouteNotFound { .. } | ApiError::NotFound(_) => StatusCode::NotFound,
            ApiError::RateLimited(_) => StatusCode::TooManyRequests,
            ApiError::Internal(_) => StatusCode::InternalServerError,
        }
    }

    pub fn into_response(self) -> Response {
        Response::error(self.status(), &self.to_string())
    }
}

impl From<ParseError> for ApiError {
    fn from(e: ParseError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

/// Library errors map by kind: not-found → 404, permission → 403,
/// throttling → 429, everything else → 500.
impl From<LibraryError> for ApiError {
    fn from(e: LibraryError) -> Self {
        let message = e.to_string();
        match e {
            LibraryError::PaperNotFound(_) | LibraryError::CollectionNotFound(_) => {
                ApiError::NotFound(message)
            }
            LibraryError::PermissionDenied(_) => ApiError::Forbidden(message),
            LibraryError::Throttled(_) => ApiError::RateLimited(message),
            LibraryError::Storage(_) => ApiError::Internal(message),
        }
    }
}

impl From<ApiError> for Response {
    fn from(e: ApiError) -> Self {
        e.into_response()
    }
}
