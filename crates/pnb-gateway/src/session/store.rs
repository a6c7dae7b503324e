//! Session records and the token-keyed session store

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;

use pnb_core::{ClientAddress, Operation, SessionError, SessionToken};

/// Shared handle to a live session
pub type SessionHandle = Arc<Session>;

/// One authorized game-play window
#[derive(Debug)]
pub struct Session {
    /// Bearer token, primary key
    pub token: SessionToken,
    /// Address the session was created from
    pub client_address: ClientAddress,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Fixed expiry time (never slides)
    pub expires_at: DateTime<Utc>,
    /// Per-operation counters, guarded per session
    quota: Mutex<QuotaWindow>,
}

/// Request counts accumulated since `window_start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaWindow {
    pub window_start: DateTime<Utc>,
    pub counts: HashMap<Operation, u32>,
}

impl QuotaWindow {
    /// Empty window starting at `start`
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            window_start: start,
            counts: HashMap::new(),
        }
    }

    /// Requests admitted for `op` in this window
    pub fn count(&self, op: Operation) -> u32 {
        self.counts.get(&op).copied().unwrap_or(0)
    }

    /// Start a fresh window at `now` with all counts zeroed
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.window_start = now;
        self.counts.clear();
    }
}

impl Session {
    /// Build a session valid for `ttl` from `now`.
    ///
    /// `ttl` must be positive so that `expires_at > created_at`. Fails if the
    /// expiry cannot be represented.
    pub fn new(
        token: SessionToken,
        client_address: ClientAddress,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<Self, SessionError> {
        debug_assert!(ttl > chrono::Duration::zero());
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(SessionError::ExpiryOutOfRange)?;
        Ok(Self {
            token,
            client_address,
            created_at: now,
            expires_at,
            quota: Mutex::new(QuotaWindow::starting_at(now)),
        })
    }

    /// Whether the session is past its expiry at `now`.
    ///
    /// A session is still usable at exactly `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Copy of the current quota window
    pub fn quota_snapshot(&self) -> QuotaWindow {
        self.quota.lock().clone()
    }

    /// Lock the quota window for a read-modify-write
    pub(crate) fn lock_quota(&self) -> MutexGuard<'_, QuotaWindow> {
        self.quota.lock()
    }
}

/// Token-keyed map of live sessions
///
/// The store only guarantees per-entry atomicity. Membership changes that
/// must stay consistent with the address index go through
/// [`SessionManager`](super::SessionManager), which serializes them.
pub struct SessionStore {
    sessions: DashMap<SessionToken, SessionHandle>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Get a session by token
    pub fn get(&self, token: &SessionToken) -> Option<SessionHandle> {
        self.sessions.get(token).map(|r| Arc::clone(&r))
    }

    /// Insert a session unless its token is already taken.
    ///
    /// On collision the session is handed back untouched.
    pub fn insert_new(&self, session: Session) -> Result<SessionHandle, Session> {
        match self.sessions.entry(session.token.clone()) {
            Entry::Occupied(_) => Err(session),
            Entry::Vacant(slot) => {
                let handle = Arc::new(session);
                slot.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    /// Remove a session; `None` if it was already gone
    pub fn remove(&self, token: &SessionToken) -> Option<SessionHandle> {
        self.sessions.remove(token).map(|(_, session)| session)
    }

    /// Tokens of sessions whose expiry is strictly before `now`
    pub fn expired_tokens(&self, now: DateTime<Utc>) -> Vec<SessionToken> {
        self.sessions
            .iter()
            .filter(|entry| entry.value().expires_at < now)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of stored sessions, expired ones included until removed
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
