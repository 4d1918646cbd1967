//! Mapping from domain errors to HTTP responses.

use agromind_core::error::{Error, StoreError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A handler failure. Wraps [`Error`] so `?` works in handlers.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self(Error::NotFound(what.into()))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self(Error::Validation(message.into()))
    }
}

impl<E: Into<Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Error::Auth(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Error::Store(StoreError::Duplicate(_)) => (
                StatusCode::CONFLICT,
                "This username is already taken.".into(),
            ),
            Error::Upstream(e) => {
                error!(error = %e, "Upstream data provider failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to sync data from the upstream provider".into(),
                )
            }
            Error::Provider(e) => {
                error!(error = %e, "Model provider failed");
                (StatusCode::BAD_GATEWAY, "Model provider failed".into())
            }
            Error::Store(e) => {
                error!(error = %e, "Store operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".into())
            }
            Error::Serialization(_) | Error::Internal(_) => {
                error!(error = %self.0, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".into())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_message();
        (status, Json(ErrorResponse { error })).into_response()
    }
}
