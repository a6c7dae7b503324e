//! Request and response bodies for the game API

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Default upper bound on scene prompt length, in characters
pub const DEFAULT_MAX_SCENE_PROMPT_LEN: usize = 200;

/// Response to `POST /api/game/start-session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    /// Opaque bearer token for subsequent calls
    pub session_token: String,
    /// RFC 3339 expiry timestamp
    pub expires_at: String,
}

/// Body of `POST /api/game/generate-scene`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSceneRequest {
    pub scene_prompt: String,
}

impl GenerateSceneRequest {
    /// Check the prompt is non-empty and at most `max_len` characters
    pub fn validate(&self, max_len: usize) -> Result<(), ProtocolError> {
        if self.scene_prompt.trim().is_empty() {
            return Err(ProtocolError::EmptyField("scenePrompt"));
        }
        let len = self.scene_prompt.chars().count();
        if len > max_len {
            return Err(ProtocolError::FieldTooLong {
                field: "scenePrompt",
                len,
                max: max_len,
            });
        }
        Ok(())
    }
}

/// Response to `POST /api/game/generate-scene`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSceneResponse {
    /// Base64-encoded PNG
    pub scene_image: String,
}

/// Body of `POST /api/game/analyze-scene`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeSceneRequest {
    /// Base64-encoded PNG previously returned by generate-scene
    pub scene_data: String,
}

impl AnalyzeSceneRequest {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.scene_data.is_empty() {
            return Err(ProtocolError::EmptyField("sceneData"));
        }
        Ok(())
    }
}

/// Response to `POST /api/game/analyze-scene`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeSceneResponse {
    pub challenge: String,
    pub solution: String,
}

/// Body of `POST /api/game/validate-challenge`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateChallengeRequest {
    pub challenge: String,
    pub solution: String,
    pub player_response: String,
}

impl ValidateChallengeRequest {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.challenge.trim().is_empty() {
            return Err(ProtocolError::EmptyField("challenge"));
        }
        if self.solution.trim().is_empty() {
            return Err(ProtocolError::EmptyField("solution"));
        }
        Ok(())
    }
}

/// Response to `POST /api/game/validate-challenge`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateChallengeResponse {
    pub correct: bool,
}

/// Response to `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub active_sessions: usize,
    pub tracked_addresses: usize,
}
