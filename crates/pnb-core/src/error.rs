//! Core error types for Pick N Brain

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{ClientAddress, Operation};

/// Top-level error type for the gateway
#[derive(Error, Debug)]
pub enum PnbError {
    /// Session error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// AI backend error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcomes of session creation, validation and quota checks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists for the presented token
    #[error("Invalid session token")]
    NotFound,

    /// The session existed but its TTL has elapsed
    #[error("Session expired")]
    Expired,

    /// The per-session hourly quota for an operation is used up
    #[error("Rate limit exceeded for {0}")]
    RateLimited(Operation),

    /// The client address already holds the maximum number of live sessions
    #[error("Maximum sessions per address reached for {address} (limit {max})")]
    AddressQuotaExceeded { address: ClientAddress, max: usize },

    /// Token generation kept colliding with live tokens
    #[error("Could not allocate a unique session token after {attempts} attempts")]
    TokenCollision { attempts: usize },

    /// A session's expiry falls outside the representable time range
    #[error("Session expiry out of range")]
    ExpiryOutOfRange,

    /// The session store and the address index disagree
    #[error("Session index out of sync for token {token} at {address}")]
    IndexDesync {
        token: String,
        address: ClientAddress,
    },
}

impl SessionError {
    /// Whether this outcome means the bearer token is not usable
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SessionError::NotFound | SessionError::Expired)
    }

    /// Whether this outcome is a quota denial the client may retry later
    pub fn is_quota(&self) -> bool {
        matches!(
            self,
            SessionError::RateLimited(_) | SessionError::AddressQuotaExceeded { .. }
        )
    }

    /// Whether this outcome signals a broken internal invariant
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SessionError::TokenCollision { .. }
                | SessionError::ExpiryOutOfRange
                | SessionError::IndexDesync { .. }
        )
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Errors from the upstream generative-AI service
#[derive(Error, Debug)]
pub enum BackendError {
    /// The request never produced a response
    #[error("Upstream request failed: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status
    #[error("Upstream returned status {status}")]
    Status { status: u16 },

    /// Response body lacked an expected field
    #[error("Upstream response missing {0}")]
    MissingField(&'static str),

    /// Response body could not be interpreted
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}
