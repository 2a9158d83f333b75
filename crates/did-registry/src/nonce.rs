//! Per-identity replay counters.
//!
//! Every accepted mutation of an identity advances its nonce by exactly
//! one. Signed authorizations must present the current value; direct
//! calls skip the comparison but still advance the counter.

use std::collections::HashMap;

use crate::error::{RegistryError, Result};
use crate::identity::Identity;

/// Replay counters keyed by identity. Absent means 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonceGuard {
    nonces: HashMap<Identity, u64>,
}

impl NonceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The nonce the next signed authorization for `identity` must carry.
    pub fn current(&self, identity: &Identity) -> u64 {
        self.nonces.get(identity).copied().unwrap_or(0)
    }

    /// Validate `presented` without touching state. Returns the nonce the
    /// identity will hold after a successful advance.
    pub fn check(&self, identity: &Identity, presented: Option<u64>) -> Result<u64> {
        let expected = self.current(identity);
        if let Some(presented) = presented {
            if presented != expected {
                return Err(RegistryError::ReplayRejected {
                    identity: *identity,
                    expected,
                    presented,
                });
            }
        }
        expected.checked_add(1).ok_or_else(|| {
            RegistryError::MalformedInput(format!("nonce of {identity} is exhausted"))
        })
    }

    /// Validate and advance. On error nothing changes.
    pub fn check_and_advance(&mut self, identity: &Identity, presented: Option<u64>) -> Result<u64> {
        let next = self.check(identity, presented)?;
        self.nonces.insert(*identity, next);
        Ok(next)
    }

    /// Check that a replayed `nonce` is the immediate successor of the
    /// current one.
    pub(crate) fn check_restore(&self, identity: &Identity, nonce: u64) -> Result<()> {
        let current = self.current(identity);
        if current.checked_add(1) != Some(nonce) {
            return Err(RegistryError::CorruptJournal(format!(
                "nonce of {identity} jumps from {current} to {nonce}"
            )));
        }
        Ok(())
    }

    /// Restore a counter while replaying a journal.
    pub(crate) fn restore(&mut self, identity: &Identity, nonce: u64) -> Result<()> {
        self.check_restore(identity, nonce)?;
        self.nonces.insert(*identity, nonce);
        Ok(())
    }
}
