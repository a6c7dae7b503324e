//! Generative-AI backend used by the gated game operations

mod gemini;
mod prompts;

pub use gemini::GeminiBackend;
pub use prompts::{QUESTION_CATEGORIES, VALIDATION_INSTRUCTION};

use async_trait::async_trait;
use pnb_core::BackendError;

/// A question about a scene and its expected answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub challenge: String,
    pub solution: String,
}

/// Upstream service that draws scenes and grades answers
#[async_trait]
pub trait SceneBackend: Send + Sync {
    /// Render `prompt` to an image, returned base64-encoded
    async fn generate_scene(&self, prompt: &str) -> Result<String, BackendError>;

    /// Ask a question about a base64-encoded scene image
    async fn analyze_scene(&self, scene_data: &str) -> Result<Challenge, BackendError>;

    /// Judge whether `player_response` answers `challenge`
    async fn validate_challenge(
        &self,
        challenge: &str,
        solution: &str,
        player_response: &str,
    ) -> Result<bool, BackendError>;
}
