//! Gateway configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::error::ConfigError;
use crate::types::Operation;

/// Configuration for the gateway daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// How long a session stays valid after creation
    #[serde(with = "duration_secs")]
    pub session_ttl: Duration,

    /// Length of the fixed quota window
    #[serde(with = "duration_secs")]
    pub quota_window: Duration,

    /// Maximum live sessions per client address
    pub max_sessions_per_address: usize,

    /// How often the reaper sweeps expired sessions
    #[serde(with = "duration_secs")]
    pub reaper_interval: Duration,

    /// Take the client address from `X-Forwarded-For` when present.
    /// Only enable behind a reverse proxy that sets the header.
    pub trust_forwarded_for: bool,

    /// Maximum scene prompt length in characters
    pub max_scene_prompt_len: usize,

    /// Per-operation limits within one quota window
    pub limits: OperationLimits,

    /// Upstream AI service
    pub backend: BackendConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            session_ttl: Duration::from_secs(3600),
            quota_window: Duration::from_secs(3600),
            max_sessions_per_address: 3,
            reaper_interval: Duration::from_secs(300),
            trust_forwarded_for: false,
            max_scene_prompt_len: 200,
            limits: OperationLimits::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Reject settings that would make every request fail or never expire
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl.is_zero() {
            return Err(ConfigError::Invalid("session_ttl must be positive".into()));
        }
        if self.quota_window.is_zero() {
            return Err(ConfigError::Invalid("quota_window must be positive".into()));
        }
        if self.reaper_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "reaper_interval must be positive".into(),
            ));
        }
        if self.max_sessions_per_address == 0 {
            return Err(ConfigError::Invalid(
                "max_sessions_per_address must be at least 1".into(),
            ));
        }
        if self.max_scene_prompt_len == 0 {
            return Err(ConfigError::Invalid(
                "max_scene_prompt_len must be at least 1".into(),
            ));
        }
        for op in Operation::ALL {
            if self.limits.limit_for(op) == 0 {
                return Err(ConfigError::Invalid(format!(
                    "limits.{} must be at least 1",
                    op
                )));
            }
        }
        crate::time::to_chrono(self.session_ttl)?;
        crate::time::to_chrono(self.quota_window)?;
        Ok(())
    }
}

/// Hourly request limits for each gated operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationLimits {
    pub generate_scene: u32,
    pub analyze_scene: u32,
    pub validate_challenge: u32,
}

impl Default for OperationLimits {
    fn default() -> Self {
        Self {
            generate_scene: 50,
            analyze_scene: 50,
            validate_challenge: 50,
        }
    }
}

impl OperationLimits {
    /// Limit configured for `op`
    pub fn limit_for(&self, op: Operation) -> u32 {
        match op {
            Operation::GenerateScene => self.generate_scene,
            Operation::AnalyzeScene => self.analyze_scene,
            Operation::ValidateChallenge => self.validate_challenge,
        }
    }
}

/// Upstream generative-AI service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the model API
    pub base_url: String,

    /// Model used for scene image generation
    pub image_model: String,

    /// Model used for scene analysis and answer grading
    pub text_model: String,

    /// Per-request timeout
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// API key; normally supplied through the environment instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            image_model: "imagen-3.0-generate-002".to_string(),
            text_model: "gemini-2.5-flash-preview-05-20".to_string(),
            request_timeout: Duration::from_secs(60),
            api_key: None,
        }
    }
}
