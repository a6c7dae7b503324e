//! Session token generation
//!
//! Tokens are 32 bytes from the thread-local CSPRNG, hex-encoded
//! (64 characters). They carry no structure and are never reused.

use rand::Rng;

use crate::types::SessionToken;

/// Length of a session token in bytes (before hex encoding)
pub const TOKEN_BYTES: usize = 32;

/// Supplier of fresh session tokens
pub trait TokenSource: Send + Sync {
    /// Produce a new token
    fn generate(&self) -> SessionToken;
}

/// Token source backed by `rand::thread_rng`
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenSource;

impl TokenSource for RandomTokenSource {
    fn generate(&self) -> SessionToken {
        SessionToken::new(generate_token())
    }
}

/// Generate a new random token
///
/// Returns a 64-character hex string (32 random bytes)
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}
