//! Request credential and origin extraction

use axum::http::{header, HeaderMap};
use std::net::SocketAddr;

use pnb_core::{ClientAddress, SessionToken};

use super::error::ApiError;

/// Pull the session token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<SessionToken, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(SessionToken::new)
        .ok_or(ApiError::MissingToken)
}

/// Address the per-address session cap is charged to.
///
/// The peer address is used unless `trust_forwarded_for` is set and the
/// request carries an `X-Forwarded-For` header, whose first entry wins.
pub fn client_address(
    headers: &HeaderMap,
    peer: SocketAddr,
    trust_forwarded_for: bool,
) -> ClientAddress {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(address) = forwarded {
            return ClientAddress::new(address);
        }
    }
    ClientAddress::from(peer.ip())
}
