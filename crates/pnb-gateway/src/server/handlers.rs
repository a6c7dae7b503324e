//! Route handlers
//!
//! Gated handlers check the bearer token before reading the body, so an
//! unauthenticated request is always a 401. The body must then parse as JSON
//! of the right shape; after that the operation's quota is charged before the
//! field contents are checked, so requests with invalid fields still count.

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;

use pnb_core::time::format_rfc3339;
use pnb_core::Operation;
use pnb_protocol::{
    AnalyzeSceneRequest, AnalyzeSceneResponse, GenerateSceneRequest, GenerateSceneResponse,
    HealthResponse, StartSessionResponse, ValidateChallengeRequest, ValidateChallengeResponse,
};

use super::error::ApiResult;
use super::extract::{bearer_token, client_address};
use crate::state::GatewayState;

/// GET /health
pub async fn health(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    let stats = state.sessions.stats();
    Json(HealthResponse {
        status: "ok".to_string(),
        active_sessions: stats.active_sessions,
        tracked_addresses: stats.tracked_addresses,
    })
}

/// POST /api/game/start-session
pub async fn start_session(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Json<StartSessionResponse>> {
    let address = client_address(&headers, peer, state.config.trust_forwarded_for);
    let session = state.sessions.create_session(address)?;

    Ok(Json(StartSessionResponse {
        session_token: session.token.as_str().to_string(),
        expires_at: format_rfc3339(&session.expires_at),
    }))
}

/// POST /api/game/generate-scene
pub async fn generate_scene(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Result<Json<GenerateSceneRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateSceneResponse>> {
    let token = bearer_token(&headers)?;
    state.sessions.validate(&token)?;
    let Json(req) = body?;
    state.sessions.authorize(&token, Operation::GenerateScene)?;
    req.validate(state.config.max_scene_prompt_len)?;

    let scene_image = state.backend.generate_scene(&req.scene_prompt).await?;
    Ok(Json(GenerateSceneResponse { scene_image }))
}

/// POST /api/game/analyze-scene
pub async fn analyze_scene(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Result<Json<AnalyzeSceneRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeSceneResponse>> {
    let token = bearer_token(&headers)?;
    state.sessions.validate(&token)?;
    let Json(req) = body?;
    state.sessions.authorize(&token, Operation::AnalyzeScene)?;
    req.validate()?;

    let challenge = state.backend.analyze_scene(&req.scene_data).await?;
    Ok(Json(AnalyzeSceneResponse {
        challenge: challenge.challenge,
        solution: challenge.solution,
    }))
}

/// POST /api/game/validate-challenge
pub async fn validate_challenge(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Result<Json<ValidateChallengeRequest>, JsonRejection>,
) -> ApiResult<Json<ValidateChallengeResponse>> {
    let token = bearer_token(&headers)?;
    state.sessions.validate(&token)?;
    let Json(req) = body?;
    state.sessions.authorize(&token, Operation::ValidateChallenge)?;
    req.validate()?;

    let correct = state
        .backend
        .validate_challenge(&req.challenge, &req.solution, &req.player_response)
        .await?;
    Ok(Json(ValidateChallengeResponse { correct }))
}

/// POST /api/game/end-session
pub async fn end_session(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let token = bearer_token(&headers)?;
    state.sessions.end_session(&token)?;
    Ok(StatusCode::NO_CONTENT)
}
