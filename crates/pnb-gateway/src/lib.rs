//! pnb-gateway: Session-scoped gateway for the Pick N Brain game
//!
//! Anonymous clients open short-lived sessions, then spend per-session hourly
//! quotas on three AI-backed operations. The gateway caps live sessions per
//! client address and reaps expired sessions in the background.

pub mod backend;
pub mod server;
pub mod session;
pub mod state;

pub use session::SessionManager;
pub use state::GatewayState;
