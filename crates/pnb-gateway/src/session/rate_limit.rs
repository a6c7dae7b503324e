//! Per-session, per-operation request quotas
//!
//! Fixed-window counting: once `window` has fully elapsed since the window
//! started, every operation's count resets at the next request. A client can
//! therefore spend up to twice its limit in a short span straddling a window
//! boundary; this matches the game's published policy and is not corrected.

use chrono::{DateTime, Utc};

use pnb_core::Operation;

use super::store::Session;

/// Outcome of a quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The request was admitted and counted
    Allowed {
        /// Requests admitted for this operation in the current window
        used: u32,
        /// Requests still available in the current window
        remaining: u32,
    },
    /// The operation's quota is used up; nothing was counted
    LimitExceeded {
        /// Time until the current window ends
        retry_after: chrono::Duration,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Fixed-window rate limiter applied to a session's counters
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    window: chrono::Duration,
}

impl RateLimiter {
    /// Create a limiter with the given window length
    pub fn new(window: chrono::Duration) -> Self {
        Self { window }
    }

    /// Window length
    pub fn window(&self) -> chrono::Duration {
        self.window
    }

    /// Count one `op` request against `session` if the quota allows it.
    ///
    /// The check and the increment happen under the session's quota lock,
    /// so concurrent callers can never admit more than `limit` requests.
    pub fn check_and_consume(
        &self,
        session: &Session,
        op: Operation,
        limit: u32,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let mut quota = session.lock_quota();

        if now - quota.window_start >= self.window {
            quota.reset(now);
        }

        let used = quota.count(op);
        if used >= limit {
            let retry_after = quota
                .window_start
                .checked_add_signed(self.window)
                .map_or(self.window, |end| end - now);
            return RateLimitDecision::LimitExceeded { retry_after };
        }

        let used = used + 1;
        quota.counts.insert(op, used);
        RateLimitDecision::Allowed {
            used,
            remaining: limit - used,
        }
    }
}
