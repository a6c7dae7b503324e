//! HTTP error responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use pnb_core::{BackendError, SessionError};
use pnb_protocol::{ErrorBody, ProtocolError};

/// Errors a handler can return to the client
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing session token")]
    MissingToken,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    InvalidRequest(#[from] ProtocolError),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ApiError {
    /// Status code and machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::MissingToken => (StatusCode::UNAUTHORIZED, "MISSING_TOKEN"),
            ApiError::Session(e) => match e {
                SessionError::NotFound => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
                SessionError::Expired => (StatusCode::UNAUTHORIZED, "SESSION_EXPIRED"),
                SessionError::RateLimited(_) => {
                    (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")
                }
                SessionError::AddressQuotaExceeded { .. } => {
                    (StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_SESSIONS")
                }
                SessionError::TokenCollision { .. }
                | SessionError::ExpiryOutOfRange
                | SessionError::IndexDesync { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
            ApiError::InvalidRequest(_) | ApiError::MalformedBody(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST")
            }
            ApiError::Backend(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Session(SessionError::RateLimited(_)) => {
                "Rate limit exceeded. Try again later.".to_string()
            }
            ApiError::Session(SessionError::AddressQuotaExceeded { .. }) => {
                "Too many active sessions".to_string()
            }
            ApiError::Session(e) if e.is_internal() => "Internal server error".to_string(),
            ApiError::Backend(_) => "Upstream AI service failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        (status, Json(ErrorBody::new(code, self.client_message()))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
