//! pnb-protocol: HTTP API wire types for the Pick N Brain gateway
//!
//! This crate defines the JSON bodies exchanged between the game client and
//! the gateway. Field names follow the camelCase convention the browser
//! client uses.

pub mod error;
pub mod message;

pub use error::{ErrorBody, ErrorDetail, ProtocolError};
pub use message::{
    AnalyzeSceneRequest, AnalyzeSceneResponse, GenerateSceneRequest, GenerateSceneResponse,
    HealthResponse, StartSessionResponse, ValidateChallengeRequest, ValidateChallengeResponse,
    DEFAULT_MAX_SCENE_PROMPT_LEN,
};
