//! Protocol error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating a request body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A required field was empty
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    /// A field exceeded its maximum length
    #[error("Field '{field}' is too long: {len} characters exceeds maximum of {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

/// JSON error body returned by every failing endpoint
///
/// ```json
/// {"error": {"code": "RATE_LIMITED", "message": "Rate limit exceeded for this session"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Machine-readable code plus human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    /// Build an error body from a code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
