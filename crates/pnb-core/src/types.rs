//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of token characters shown in logs
const REDACTED_PREFIX_LEN: usize = 8;

/// Opaque bearer token identifying a game session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the raw token string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix that is safe to write to logs
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(REDACTED_PREFIX_LEN).collect();
        format!("{}…", prefix)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Network origin of a request, usually the peer IP
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientAddress(String);

impl ClientAddress {
    /// Create a new client address
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get the raw address string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClientAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<std::net::IpAddr> for ClientAddress {
    fn from(ip: std::net::IpAddr) -> Self {
        Self(ip.to_string())
    }
}

/// A quota-gated gateway operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Image generation from a scene prompt
    GenerateScene,
    /// Question/answer extraction from a generated scene
    AnalyzeScene,
    /// Grading of a player's answer
    ValidateChallenge,
}

impl Operation {
    /// Every gated operation
    pub const ALL: [Operation; 3] = [
        Operation::GenerateScene,
        Operation::AnalyzeScene,
        Operation::ValidateChallenge,
    ];

    /// Stable name used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GenerateScene => "generate_scene",
            Operation::AnalyzeScene => "analyze_scene",
            Operation::ValidateChallenge => "validate_challenge",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operation: {}", s))
    }
}
