//! Who currently controls each identity.

use std::collections::HashMap;

use super::address::Identity;

/// Mapping from identity to its current owner.
///
/// An identity with no record is owned by itself. Records are only ever
/// overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityLedger {
    owners: HashMap<Identity, Identity>,
}

impl IdentityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current owner of `identity`.
    pub fn owner_of(&self, identity: &Identity) -> Identity {
        self.owners.get(identity).copied().unwrap_or(*identity)
    }

    /// Overwrite the owner record. Callers must have authorized the change.
    pub(crate) fn set_owner(&mut self, identity: Identity, new_owner: Identity) {
        self.owners.insert(identity, new_owner);
    }

    /// True if ownership of `identity` was ever changed.
    pub fn has_record(&self, identity: &Identity) -> bool {
        self.owners.contains_key(identity)
    }

    /// Number of identities with an explicit owner record.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
