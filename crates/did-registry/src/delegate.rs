//! Typed, time-bounded delegate authorizations.
//!
//! A delegate record maps (identity, delegate type, delegate) to an
//! absolute expiry. A delegate is valid strictly before its expiry: at
//! `now == expiry` it is already invalid.
//!
//! Grants always overwrite: a second grant for the same key sets the
//! expiry to `now + duration` even if that is earlier than the previous
//! expiry. Revocation pulls a future expiry back to `now` and leaves an
//! already-past expiry alone, so it never resurrects a delegate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::identity::{Identity, Tag};

/// Composite key of a delegate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DelegateKey {
    pub identity: Identity,
    pub delegate_type: Tag,
    pub delegate: Identity,
}

impl DelegateKey {
    pub fn new(identity: Identity, delegate_type: Tag, delegate: Identity) -> Self {
        Self {
            identity,
            delegate_type,
            delegate,
        }
    }
}

/// Direction of a delegate mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegateChange {
    Granted,
    Revoked,
}

impl DelegateChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Revoked => "revoked",
        }
    }
}

/// A delegate with its expiry, as returned by listing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateEntry {
    pub delegate_type: Tag,
    pub delegate: Identity,
    pub expires_at: u64,
}

/// Expiry deadlines keyed by [`DelegateKey`]. Absent means 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegateRegistry {
    expiries: HashMap<DelegateKey, u64>,
}

impl DelegateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute expiry of `key`, or 0 if never granted.
    pub fn expiry_of(&self, key: &DelegateKey) -> u64 {
        self.expiries.get(key).copied().unwrap_or(0)
    }

    /// `expiry > now`.
    pub fn is_valid(&self, key: &DelegateKey, now: u64) -> bool {
        self.expiry_of(key) > now
    }

    /// Set the expiry to `valid_to`, replacing whatever was there.
    pub(crate) fn grant(&mut self, key: DelegateKey, valid_to: u64) {
        self.expiries.insert(key, valid_to);
    }

    /// Force the expiry to `now` if it lies in the future. Returns the
    /// resulting expiry.
    pub(crate) fn revoke(&mut self, key: DelegateKey, now: u64) -> u64 {
        match self.expiries.get_mut(&key) {
            Some(expiry) if *expiry > now => {
                *expiry = now;
                now
            }
            Some(expiry) => *expiry,
            None => 0,
        }
    }

    /// Apply a recorded change, as carried by a `DelegateChanged` event.
    pub(crate) fn apply(&mut self, key: DelegateKey, change: DelegateChange, valid_to: u64) {
        match change {
            DelegateChange::Granted => self.grant(key, valid_to),
            DelegateChange::Revoked => {
                self.revoke(key, valid_to);
            }
        }
    }

    /// Every delegate ever recorded for `identity`, ordered by type then
    /// delegate.
    pub fn delegates_of(&self, identity: &Identity) -> Vec<DelegateEntry> {
        let mut entries: Vec<DelegateEntry> = self
            .expiries
            .iter()
            .filter(|(key, _)| key.identity == *identity)
            .map(|(key, expiry)| DelegateEntry {
                delegate_type: key.delegate_type,
                delegate: key.delegate,
                expires_at: *expiry,
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.delegate_type, a.delegate).cmp(&(b.delegate_type, b.delegate))
        });
        entries
    }

    /// Delegates of `identity` still valid at `now`.
    pub fn valid_delegates(&self, identity: &Identity, now: u64) -> Vec<DelegateEntry> {
        self.delegates_of(identity)
            .into_iter()
            .filter(|e| e.expires_at > now)
            .collect()
    }

    /// Number of delegate records held.
    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }
}
