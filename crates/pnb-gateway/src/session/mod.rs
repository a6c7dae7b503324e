//! Session management

mod ip_index;
mod manager;
mod rate_limit;
mod reaper;
mod store;

pub use ip_index::IpSessionIndex;
pub use manager::{ReapReport, SessionManager, SessionPolicy, SessionStats};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use reaper::{run_session_reaper, spawn_session_reaper, DEFAULT_REAPER_INTERVAL};
pub use store::{QuotaWindow, Session, SessionHandle, SessionStore};
