//! Session manager: creation, validation, quota checks and eviction
//!
//! # Locking
//!
//! Every change to session membership (create, lazy expiry, explicit end,
//! reaping) runs under the address-index mutex, so the store and the index
//! never disagree as seen by a concurrent creator. Lookups go straight to the
//! store and do not touch the index lock.
//!
//! Locks are always taken in this order:
//!
//! 1. address-index mutex
//! 2. store shard lock (held only inside a single map call)
//! 3. per-session quota mutex
//!
//! A store reference is never held while waiting on the index mutex, and no
//! lock is held across an `.await`: all methods here are synchronous, so a
//! cancelled request either completed its check-and-mutate or never began it.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use pnb_core::config::{GatewayConfig, OperationLimits};
use pnb_core::time::to_chrono;
use pnb_core::{
    ClientAddress, Clock, ConfigError, Operation, RandomTokenSource, SessionError, SessionToken,
    SystemClock, TokenSource,
};

use super::ip_index::IpSessionIndex;
use super::rate_limit::{RateLimitDecision, RateLimiter};
use super::store::{Session, SessionHandle, SessionStore};

/// Attempts at drawing an unused token before giving up
const MAX_TOKEN_ATTEMPTS: usize = 8;

/// Lifetimes and limits applied to sessions
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Time from creation to expiry
    pub ttl: chrono::Duration,
    /// Length of the quota window
    pub quota_window: chrono::Duration,
    /// Maximum live sessions per client address
    pub max_sessions_per_address: usize,
    /// Per-operation limits within one window
    pub limits: OperationLimits,
}

impl SessionPolicy {
    /// Derive the policy from validated gateway configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ttl: to_chrono(config.session_ttl)?,
            quota_window: to_chrono(config.quota_window)?,
            max_sessions_per_address: config.max_sessions_per_address,
            limits: config.limits,
        })
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: chrono::Duration::hours(1),
            quota_window: chrono::Duration::hours(1),
            max_sessions_per_address: 3,
            limits: OperationLimits::default(),
        }
    }
}

/// Result of one reaper sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Sessions found expired at the start of the sweep
    pub expired: usize,
    /// Sessions removed by this sweep
    pub removed: usize,
    /// Sessions whose removal hit an invariant violation
    pub failures: usize,
}

/// Point-in-time counts for health reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub tracked_addresses: usize,
}

/// Owns all session state for the gateway
pub struct SessionManager {
    policy: SessionPolicy,
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenSource>,
    store: SessionStore,
    index: Mutex<IpSessionIndex>,
    limiter: RateLimiter,
}

impl SessionManager {
    /// Create a manager using the system clock and random tokens
    pub fn new(policy: SessionPolicy) -> Self {
        Self::with_sources(policy, Arc::new(SystemClock), Arc::new(RandomTokenSource))
    }

    /// Create a manager with explicit time and token sources
    pub fn with_sources(
        policy: SessionPolicy,
        clock: Arc<dyn Clock>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            policy,
            clock,
            tokens,
            store: SessionStore::new(),
            index: Mutex::new(IpSessionIndex::new(policy.max_sessions_per_address)),
            limiter: RateLimiter::new(policy.quota_window),
        }
    }

    /// Active policy
    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Open a new session for `address`.
    ///
    /// Refused with [`SessionError::AddressQuotaExceeded`] when the address
    /// already holds the maximum number of live sessions.
    pub fn create_session(&self, address: ClientAddress) -> Result<SessionHandle, SessionError> {
        let now = self.clock.now();
        let mut index = self.index.lock();

        if !index.can_create(&address) {
            tracing::debug!(
                "Refusing session for {}: {} live sessions",
                address,
                index.live_count(&address)
            );
            return Err(SessionError::AddressQuotaExceeded {
                address,
                max: index.max_per_address(),
            });
        }

        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let token = self.tokens.generate();
            let session = Session::new(token.clone(), address.clone(), now, self.policy.ttl)
                .map_err(|e| {
                    tracing::error!("Cannot create session for {}: {}", address, e);
                    e
                })?;

            let handle = match self.store.insert_new(session) {
                Ok(handle) => handle,
                Err(_) => {
                    tracing::warn!(
                        "Session token collision on attempt {} ({})",
                        attempt,
                        token.redacted()
                    );
                    continue;
                }
            };

            if let Err(e) = index.register(&address, &token) {
                // Index and store disagree; back the insert out and deny
                self.store.remove(&token);
                tracing::error!("Failed to register session {}: {}", token.redacted(), e);
                return Err(e);
            }

            tracing::debug!(
                "Created session {} for {} (expires {})",
                token.redacted(),
                address,
                handle.expires_at
            );
            return Ok(handle);
        }

        tracing::error!(
            "Could not allocate a unique session token after {} attempts",
            MAX_TOKEN_ATTEMPTS
        );
        Err(SessionError::TokenCollision {
            attempts: MAX_TOKEN_ATTEMPTS,
        })
    }

    /// Look up a live session.
    ///
    /// An expired session is removed on sight and reported as
    /// [`SessionError::Expired`]; later lookups see [`SessionError::NotFound`].
    pub fn validate(&self, token: &SessionToken) -> Result<SessionHandle, SessionError> {
        self.validate_at(token, self.clock.now())
    }

    /// Validate `token` and count one `op` request against `limit`
    pub fn authenticate_and_authorize(
        &self,
        token: &SessionToken,
        op: Operation,
        limit: u32,
    ) -> Result<SessionHandle, SessionError> {
        let now = self.clock.now();
        let session = self.validate_at(token, now)?;

        match self.limiter.check_and_consume(&session, op, limit, now) {
            RateLimitDecision::Allowed { used, remaining } => {
                tracing::trace!(
                    "Admitted {} for {} ({} used, {} remaining)",
                    op,
                    token.redacted(),
                    used,
                    remaining
                );
                Ok(session)
            }
            RateLimitDecision::LimitExceeded { retry_after } => {
                tracing::debug!(
                    "Rate limited {} for {} (window resets in {}s)",
                    op,
                    token.redacted(),
                    retry_after.num_seconds()
                );
                Err(SessionError::RateLimited(op))
            }
        }
    }

    /// [`authenticate_and_authorize`](Self::authenticate_and_authorize) with
    /// the configured limit for `op`
    pub fn authorize(
        &self,
        token: &SessionToken,
        op: Operation,
    ) -> Result<SessionHandle, SessionError> {
        self.authenticate_and_authorize(token, op, self.policy.limits.limit_for(op))
    }

    /// End a live session at the client's request
    pub fn end_session(&self, token: &SessionToken) -> Result<(), SessionError> {
        self.validate(token)?;
        self.evict_if(token, |_| true)?;
        tracing::debug!("Ended session {}", token.redacted());
        Ok(())
    }

    /// Delete a session regardless of state; no-op if absent
    pub fn remove(&self, token: &SessionToken) -> Result<Option<SessionHandle>, SessionError> {
        self.evict_if(token, |_| true)
    }

    /// Remove every session whose expiry is strictly in the past.
    ///
    /// A failure on one session is logged and does not stop the sweep.
    pub fn reap_expired(&self) -> ReapReport {
        let now = self.clock.now();
        let expired = self.store.expired_tokens(now);
        let mut report = ReapReport {
            expired: expired.len(),
            ..ReapReport::default()
        };

        for token in expired {
            match self.evict_if(&token, |s| s.expires_at < now) {
                Ok(Some(_)) => report.removed += 1,
                // Already removed by a concurrent validate or end_session
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Failed to reap session {}: {}", token.redacted(), e);
                    report.failures += 1;
                }
            }
        }

        report
    }

    /// Current counts for health reporting
    pub fn stats(&self) -> SessionStats {
        let index = self.index.lock();
        SessionStats {
            active_sessions: self.store.len(),
            tracked_addresses: index.address_count(),
        }
    }

    /// Live sessions registered for `address`
    pub fn live_sessions_for(&self, address: &ClientAddress) -> usize {
        self.index.lock().live_count(address)
    }

    /// Whether the store still holds `token` (expired or not)
    pub fn contains(&self, token: &SessionToken) -> bool {
        self.store.get(token).is_some()
    }

    fn validate_at(
        &self,
        token: &SessionToken,
        now: DateTime<Utc>,
    ) -> Result<SessionHandle, SessionError> {
        let session = self.store.get(token).ok_or(SessionError::NotFound)?;

        if session.is_expired_at(now) {
            if let Err(e) = self.evict_if(token, |s| s.is_expired_at(now)) {
                tracing::error!(
                    "Failed to remove expired session {}: {}",
                    token.redacted(),
                    e
                );
            }
            tracing::debug!("Session {} expired on access", token.redacted());
            return Err(SessionError::Expired);
        }

        Ok(session)
    }

    /// Remove `token` from store and index together if `predicate` holds for
    /// the stored session.
    ///
    /// On an index mismatch the session is still gone from the store, so a
    /// broken record can never be used again.
    fn evict_if<F>(
        &self,
        token: &SessionToken,
        predicate: F,
    ) -> Result<Option<SessionHandle>, SessionError>
    where
        F: FnOnce(&Session) -> bool,
    {
        let mut index = self.index.lock();

        let Some(session) = self.store.get(token) else {
            return Ok(None);
        };
        if !predicate(&session) {
            return Ok(None);
        }

        self.store.remove(token);
        index.unregister(&session.client_address, token)?;
        Ok(Some(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pnb_core::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replays a fixed list of tokens, then repeats the last one
    struct ScriptedTokens {
        tokens: Vec<&'static str>,
        next: AtomicUsize,
    }

    impl ScriptedTokens {
        fn new(tokens: Vec<&'static str>) -> Self {
            Self {
                tokens,
                next: AtomicUsize::new(0),
            }
        }
    }

    impl TokenSource for ScriptedTokens {
        fn generate(&self) -> SessionToken {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            let token = self.tokens.get(i).or(self.tokens.last()).copied().unwrap_or("");
            SessionToken::new(token)
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn manager_with(clock: Arc<ManualClock>) -> SessionManager {
        SessionManager::with_sources(
            SessionPolicy::default(),
            clock,
            Arc::new(RandomTokenSource),
        )
    }

    #[test]
    fn test_create_registers_in_store_and_index() {
        let clock = clock();
        let manager = manager_with(clock.clone());
        let address = ClientAddress::new("1.2.3.4");

        let session = manager.create_session(address.clone()).unwrap();
        assert_eq!(session.expires_at, clock.now() + chrono::Duration::hours(1));
        assert!(manager.contains(&session.token));
        assert_eq!(manager.live_sessions_for(&address), 1);
    }

    #[test]
    fn test_validate_unknown_token() {
        let manager = manager_with(clock());
        assert_eq!(
            manager.validate(&SessionToken::new("nope")).unwrap_err(),
            SessionError::NotFound
        );
    }

    #[test]
    fn test_expired_session_removed_on_validate() {
        let clock = clock();
        let manager = manager_with(clock.clone());
        let address = ClientAddress::new("1.2.3.4");
        let token = manager.create_session(address.clone()).unwrap().token.clone();

        clock.advance(Duration::from_secs(3601));
        assert_eq!(manager.validate(&token).unwrap_err(), SessionError::Expired);
        assert!(!manager.contains(&token));
        assert_eq!(manager.live_sessions_for(&address), 0);
        assert_eq!(manager.validate(&token).unwrap_err(), SessionError::NotFound);
    }

    #[test]
    fn test_token_collision_regenerates() {
        let clock = clock();
        let manager = SessionManager::with_sources(
            SessionPolicy::default(),
            clock,
            Arc::new(ScriptedTokens::new(vec!["aaa", "aaa", "bbb"])),
        );

        let first = manager.create_session(ClientAddress::new("1.1.1.1")).unwrap();
        let second = manager.create_session(ClientAddress::new("2.2.2.2")).unwrap();
        assert_eq!(first.token.as_str(), "aaa");
        assert_eq!(second.token.as_str(), "bbb");
        assert_eq!(manager.stats().active_sessions, 2);
    }

    #[test]
    fn test_token_collision_exhaustion_fails_closed() {
        let manager = SessionManager::with_sources(
            SessionPolicy::default(),
            clock(),
            Arc::new(ScriptedTokens::new(vec!["same"])),
        );

        manager.create_session(ClientAddress::new("1.1.1.1")).unwrap();
        let err = manager
            .create_session(ClientAddress::new("2.2.2.2"))
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::TokenCollision {
                attempts: MAX_TOKEN_ATTEMPTS
            }
        );
        assert_eq!(manager.live_sessions_for(&ClientAddress::new("2.2.2.2")), 0);
        assert_eq!(manager.stats().active_sessions, 1);
    }

    #[test]
    fn test_authorize_uses_configured_limit() {
        let mut policy = SessionPolicy::default();
        policy.limits.analyze_scene = 2;
        let manager =
            SessionManager::with_sources(policy, clock(), Arc::new(RandomTokenSource));
        let token = manager
            .create_session(ClientAddress::new("1.2.3.4"))
            .unwrap()
            .token
            .clone();

        assert!(manager.authorize(&token, Operation::AnalyzeScene).is_ok());
        assert!(manager.authorize(&token, Operation::AnalyzeScene).is_ok());
        assert_eq!(
            manager.authorize(&token, Operation::AnalyzeScene).unwrap_err(),
            SessionError::RateLimited(Operation::AnalyzeScene)
        );
        assert!(manager.authorize(&token, Operation::GenerateScene).is_ok());
    }

    #[test]
    fn test_end_session_frees_address_slot() {
        let manager = manager_with(clock());
        let address = ClientAddress::new("1.2.3.4");
        let tokens: Vec<_> = (0..3)
            .map(|_| manager.create_session(address.clone()).unwrap().token.clone())
            .collect();
        assert!(manager.create_session(address.clone()).is_err());

        manager.end_session(&tokens[0]).unwrap();
        assert_eq!(
            manager.end_session(&tokens[0]).unwrap_err(),
            SessionError::NotFound
        );
        assert!(manager.create_session(address).is_ok());
    }

    #[test]
    fn test_unrepresentable_expiry_fails_closed() {
        let policy = SessionPolicy {
            ttl: chrono::Duration::days(365 * 1_000_000),
            ..SessionPolicy::default()
        };
        let manager = SessionManager::with_sources(policy, clock(), Arc::new(RandomTokenSource));
        let address = ClientAddress::new("1.2.3.4");

        assert_eq!(
            manager.create_session(address.clone()).unwrap_err(),
            SessionError::ExpiryOutOfRange
        );
        assert_eq!(manager.live_sessions_for(&address), 0);
        assert_eq!(manager.stats().active_sessions, 0);
    }

    #[test]
    fn test_reap_skips_desynced_session_and_continues() {
        let clock = clock();
        let manager = manager_with(clock.clone());
        let broken_addr = ClientAddress::new("1.1.1.1");
        let broken = manager
            .create_session(broken_addr.clone())
            .unwrap()
            .token
            .clone();
        let healthy = manager
            .create_session(ClientAddress::new("2.2.2.2"))
            .unwrap()
            .token
            .clone();

        // Drop the index entry behind the store's back
        manager.index.lock().unregister(&broken_addr, &broken).unwrap();

        clock.advance(Duration::from_secs(3601));
        let report = manager.reap_expired();
        assert_eq!(
            report,
            ReapReport {
                expired: 2,
                removed: 1,
                failures: 1
            }
        );
        assert!(!manager.contains(&healthy));
        // The broken record is still taken out of the store
        assert!(!manager.contains(&broken));
        assert_eq!(manager.stats().tracked_addresses, 0);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let manager = manager_with(clock());
        let token = manager
            .create_session(ClientAddress::new("1.2.3.4"))
            .unwrap()
            .token
            .clone();

        assert!(manager.remove(&token).unwrap().is_some());
        assert!(manager.remove(&token).unwrap().is_none());
        assert_eq!(manager.stats().tracked_addresses, 0);
    }

    #[test]
    fn test_reap_only_removes_expired() {
        let clock = clock();
        let manager = manager_with(clock.clone());
        let old = manager
            .create_session(ClientAddress::new("1.1.1.1"))
            .unwrap()
            .token
            .clone();
        clock.advance(Duration::from_secs(1800));
        let fresh = manager
            .create_session(ClientAddress::new("2.2.2.2"))
            .unwrap()
            .token
            .clone();

        clock.advance(Duration::from_secs(1801));
        let report = manager.reap_expired();
        assert_eq!(
            report,
            ReapReport {
                expired: 1,
                removed: 1,
                failures: 0
            }
        );
        assert!(!manager.contains(&old));
        assert!(manager.contains(&fresh));
        assert_eq!(manager.stats().tracked_addresses, 1);
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = GatewayConfig::default();
        config.session_ttl = Duration::from_secs(600);
        config.limits.generate_scene = 7;

        let policy = SessionPolicy::from_config(&config).unwrap();
        assert_eq!(policy.ttl, chrono::Duration::minutes(10));
        assert_eq!(policy.limits.generate_scene, 7);

        config.max_sessions_per_address = 0;
        assert!(SessionPolicy::from_config(&config).is_err());
    }
}
