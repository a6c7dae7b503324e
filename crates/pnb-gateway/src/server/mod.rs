//! HTTP surface of the gateway
//!
//! # Endpoints
//!
//! | Method | Path | Gate |
//! |--------|------|------|
//! | `GET`  | `/health` | none |
//! | `POST` | `/api/game/start-session` | per-address session cap |
//! | `POST` | `/api/game/generate-scene` | session + `generate_scene` quota |
//! | `POST` | `/api/game/analyze-scene` | session + `analyze_scene` quota |
//! | `POST` | `/api/game/validate-challenge` | session + `validate_challenge` quota |
//! | `POST` | `/api/game/end-session` | session |

mod error;
mod extract;
mod handlers;

pub use error::{ApiError, ApiResult};
pub use extract::{bearer_token, client_address};

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::GatewayState;

/// Build the gateway router over `state`
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/game/start-session", post(handlers::start_session))
        .route("/api/game/generate-scene", post(handlers::generate_scene))
        .route("/api/game/analyze-scene", post(handlers::analyze_scene))
        .route(
            "/api/game/validate-challenge",
            post(handlers::validate_challenge),
        )
        .route("/api/game/end-session", post(handlers::end_session))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Serve the gateway on `listener` until `cancel` fires, then drain
pub async fn serve(
    listener: TcpListener,
    state: Arc<GatewayState>,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let local = listener.local_addr()?;
    tracing::info!("Gateway listening on {}", local);

    let app = build_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        cancel.cancelled().await;
        tracing::info!("HTTP server draining connections");
    })
    .await
}
