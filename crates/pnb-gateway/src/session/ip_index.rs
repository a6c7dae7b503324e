//! Live-session index keyed by client address
//!
//! Bounds how many sessions one address may hold at a time. The index is a
//! plain data structure; callers serialize access to it (see
//! [`SessionManager`](super::SessionManager)) so that the capacity check and
//! the registration happen as one step.

use std::collections::{HashMap, HashSet};

use pnb_core::{ClientAddress, SessionError, SessionToken};

/// Tokens of live sessions grouped by originating address
#[derive(Debug)]
pub struct IpSessionIndex {
    /// Cap on live sessions per address
    max_per_address: usize,
    /// Live tokens per address; never holds an empty set
    by_address: HashMap<ClientAddress, HashSet<SessionToken>>,
    /// Reverse map so a token belongs to exactly one address
    owners: HashMap<SessionToken, ClientAddress>,
}

impl IpSessionIndex {
    /// Create an empty index with the given per-address cap
    pub fn new(max_per_address: usize) -> Self {
        Self {
            max_per_address,
            by_address: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Configured per-address cap
    pub fn max_per_address(&self) -> usize {
        self.max_per_address
    }

    /// Number of live sessions registered for `address`
    pub fn live_count(&self, address: &ClientAddress) -> usize {
        self.by_address.get(address).map_or(0, HashSet::len)
    }

    /// Whether `address` may open another session
    pub fn can_create(&self, address: &ClientAddress) -> bool {
        self.live_count(address) < self.max_per_address
    }

    /// Check the cap and record `token` under `address` in one step
    pub fn register(
        &mut self,
        address: &ClientAddress,
        token: &SessionToken,
    ) -> Result<(), SessionError> {
        if let Some(owner) = self.owners.get(token) {
            return Err(SessionError::IndexDesync {
                token: token.redacted(),
                address: owner.clone(),
            });
        }
        if !self.can_create(address) {
            return Err(SessionError::AddressQuotaExceeded {
                address: address.clone(),
                max: self.max_per_address,
            });
        }

        self.by_address
            .entry(address.clone())
            .or_default()
            .insert(token.clone());
        self.owners.insert(token.clone(), address.clone());
        Ok(())
    }

    /// Remove `token` from `address`, dropping the address once empty.
    ///
    /// Fails if the token is not registered under that address.
    pub fn unregister(
        &mut self,
        address: &ClientAddress,
        token: &SessionToken,
    ) -> Result<(), SessionError> {
        let desync = || SessionError::IndexDesync {
            token: token.redacted(),
            address: address.clone(),
        };

        match self.owners.get(token) {
            Some(owner) if owner == address => {}
            _ => return Err(desync()),
        }

        let tokens = self.by_address.get_mut(address).ok_or_else(desync)?;
        if !tokens.remove(token) {
            return Err(desync());
        }
        if tokens.is_empty() {
            self.by_address.remove(address);
        }
        self.owners.remove(token);
        Ok(())
    }

    /// Whether `token` is registered under `address`
    pub fn contains(&self, address: &ClientAddress, token: &SessionToken) -> bool {
        self.by_address
            .get(address)
            .is_some_and(|tokens| tokens.contains(token))
    }

    /// Number of addresses with at least one live session
    pub fn address_count(&self) -> usize {
        self.by_address.len()
    }

    /// Total registered tokens
    pub fn token_count(&self) -> usize {
        self.owners.len()
    }
}
