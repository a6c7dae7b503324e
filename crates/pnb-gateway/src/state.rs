//! Global gateway state

use std::sync::Arc;

use pnb_core::config::GatewayConfig;
use pnb_core::ConfigError;

use crate::backend::SceneBackend;
use crate::session::{SessionManager, SessionPolicy};

/// State shared by every request handler
pub struct GatewayState {
    /// Configuration
    pub config: GatewayConfig,
    /// Session manager
    pub sessions: Arc<SessionManager>,
    /// AI backend
    pub backend: Arc<dyn SceneBackend>,
}

impl GatewayState {
    /// Create state with a session manager built from `config`
    pub fn new(config: GatewayConfig, backend: Arc<dyn SceneBackend>) -> Result<Self, ConfigError> {
        let policy = SessionPolicy::from_config(&config)?;
        Ok(Self {
            config,
            sessions: Arc::new(SessionManager::new(policy)),
            backend,
        })
    }

    /// Create state around an existing session manager
    pub fn with_sessions(
        config: GatewayConfig,
        sessions: Arc<SessionManager>,
        backend: Arc<dyn SceneBackend>,
    ) -> Self {
        Self {
            config,
            sessions,
            backend,
        }
    }
}
