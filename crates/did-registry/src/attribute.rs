//! Event-sourced attribute claims.
//!
//! Attributes are never stored as a mutable map. Every set or revoke
//! appends an [`AttributeEvent`], and the current state is derived from
//! the log: for an exact (identity, name, value) the latest event by
//! sequence number wins, and the claim is valid while that event's
//! `valid_to` lies in the future. Several values may be valid under the
//! same name at once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::identity::{Identity, Tag};

/// One append-only attribute entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeEvent {
    /// Position in the log, starting at 0.
    pub sequence: u64,
    pub identity: Identity,
    pub name: Tag,
    #[serde(with = "value_hex")]
    pub value: Vec<u8>,
    /// Absolute deadline; `valid_to <= now` means revoked or expired.
    pub valid_to: u64,
}

impl AttributeEvent {
    pub fn is_valid_at(&self, now: u64) -> bool {
        self.valid_to > now
    }
}

/// Append-only attribute log with an index of the latest event per
/// (identity, name, value).
#[derive(Debug, Clone, Default)]
pub struct AttributeLog {
    events: Vec<AttributeEvent>,
    latest: HashMap<(Identity, Tag), HashMap<Vec<u8>, usize>>,
}

impl AttributeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Existing entries are never modified.
    pub(crate) fn append(
        &mut self,
        identity: Identity,
        name: Tag,
        value: Vec<u8>,
        valid_to: u64,
    ) -> &AttributeEvent {
        let index = self.events.len();
        self.latest
            .entry((identity, name))
            .or_default()
            .insert(value.clone(), index);
        self.events.push(AttributeEvent {
            sequence: index as u64,
            identity,
            name,
            value,
            valid_to,
        });
        &self.events[index]
    }

    /// Latest event for the exact (identity, name, value) triple.
    pub fn latest(&self, identity: &Identity, name: &Tag, value: &[u8]) -> Option<&AttributeEvent> {
        self.latest
            .get(&(*identity, *name))
            .and_then(|values| values.get(value))
            .map(|&i| &self.events[i])
    }

    /// Whether the (name, value) claim of `identity` is valid at `now`.
    pub fn is_currently_valid(&self, identity: &Identity, name: &Tag, value: &[u8], now: u64) -> bool {
        self.latest(identity, name, value)
            .is_some_and(|event| event.is_valid_at(now))
    }

    /// The most recently set value under `name` that is still valid.
    pub fn current_value(&self, identity: &Identity, name: &Tag, now: u64) -> Option<&AttributeEvent> {
        self.latest
            .get(&(*identity, *name))?
            .values()
            .map(|&i| &self.events[i])
            .filter(|event| event.is_valid_at(now))
            .max_by_key(|event| event.sequence)
    }

    /// All valid claims of `identity` at `now`, in log order.
    pub fn current_attributes(&self, identity: &Identity, now: u64) -> Vec<&AttributeEvent> {
        let mut current: Vec<&AttributeEvent> = self
            .latest
            .iter()
            .filter(|((id, _), _)| id == identity)
            .flat_map(|(_, values)| values.values())
            .map(|&i| &self.events[i])
            .filter(|event| event.is_valid_at(now))
            .collect();
        current.sort_by_key(|event| event.sequence);
        current
    }

    /// Every entry for `identity`, in log order.
    pub fn history<'a>(&'a self, identity: &'a Identity) -> impl Iterator<Item = &'a AttributeEvent> + 'a {
        self.events.iter().filter(move |e| e.identity == *identity)
    }

    pub fn events(&self) -> &[AttributeEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Serde adapter rendering opaque bytes as `0x` hex.
pub(crate) mod value_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}
