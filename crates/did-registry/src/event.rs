//! The registry event stream.
//!
//! Every accepted mutation emits exactly one [`RegistryEvent`]. The stream
//! is append-only and totally ordered; it is the durable record from
//! which owner, delegate, nonce and attribute state can be rebuilt.
//!
//! Each event links to the previous event of the same identity through
//! `previous_change`, so an indexer can walk one identity's history
//! backwards without scanning the whole stream. Each event also carries
//! `hash = SHA-256(previous hash || fixed-width event encoding)`, chaining the
//! stream so that any rewrite or reordering is detectable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::delegate::DelegateChange;
use crate::error::{RegistryError, Result};
use crate::identity::{Identity, Tag};

/// Hash that precedes the first event.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// What a mutation changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    OwnerChanged {
        owner: Identity,
    },
    DelegateChanged {
        delegate_type: Tag,
        delegate: Identity,
        valid_to: u64,
        change: DelegateChange,
    },
    AttributeChanged {
        name: Tag,
        #[serde(with = "crate::attribute::value_hex")]
        value: Vec<u8>,
        valid_to: u64,
    },
}

impl EventKind {
    /// Fixed-width, tagged byte encoding used for hashing.
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::OwnerChanged { owner } => {
                out.push(0);
                out.extend_from_slice(owner.as_bytes());
            }
            Self::DelegateChanged {
                delegate_type,
                delegate,
                valid_to,
                change,
            } => {
                out.push(1);
                out.extend_from_slice(delegate_type.as_bytes());
                out.extend_from_slice(delegate.as_bytes());
                out.extend_from_slice(&valid_to.to_be_bytes());
                out.push(match change {
                    DelegateChange::Granted => 0,
                    DelegateChange::Revoked => 1,
                });
            }
            Self::AttributeChanged {
                name,
                value,
                valid_to,
            } => {
                out.push(2);
                out.extend_from_slice(name.as_bytes());
                out.extend_from_slice(&valid_to.to_be_bytes());
                out.extend_from_slice(&(value.len() as u64).to_be_bytes());
                out.extend_from_slice(value);
            }
        }
        out
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OwnerChanged { .. } => "OwnerChanged",
            Self::DelegateChanged { .. } => "DelegateChanged",
            Self::AttributeChanged { .. } => "AttributeChanged",
        }
    }
}

/// One entry of the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEvent {
    /// Position in the stream, starting at 0.
    pub sequence: u64,
    /// Identity whose records changed.
    pub identity: Identity,
    /// The identity's nonce after the mutation.
    pub nonce: u64,
    /// Time the mutation was applied (seconds since epoch).
    pub timestamp: u64,
    /// Sequence of the previous event for the same identity.
    pub previous_change: Option<u64>,
    pub kind: EventKind,
    /// Hex SHA-256 chaining this event to its predecessor.
    pub hash: String,
}

impl RegistryEvent {
    /// Recompute this event's hash given its predecessor's.
    pub fn compute_hash(&self, previous_hash: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(previous_hash.as_bytes());
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(self.identity.as_bytes());
        hasher.update(self.nonce.to_be_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        match self.previous_change {
            Some(seq) => {
                hasher.update([1u8]);
                hasher.update(seq.to_be_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update(self.kind.encode());
        hex::encode(hasher.finalize())
    }
}

/// Append-only, hash-chained event stream.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<RegistryEvent>,
    last_change: HashMap<Identity, u64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new event and return it.
    pub(crate) fn emit(
        &mut self,
        identity: Identity,
        nonce: u64,
        timestamp: u64,
        kind: EventKind,
    ) -> &RegistryEvent {
        let mut event = RegistryEvent {
            sequence: self.events.len() as u64,
            identity,
            nonce,
            timestamp,
            previous_change: self.last_change(&identity),
            kind,
            hash: String::new(),
        };
        event.hash = event.compute_hash(self.head_hash());
        self.push(event)
    }

    /// Append an event read from storage after checking that it extends
    /// this stream: next sequence, correct identity link, matching hash.
    pub(crate) fn append_verified(&mut self, event: RegistryEvent) -> Result<&RegistryEvent> {
        let expected_seq = self.events.len() as u64;
        if event.sequence != expected_seq {
            return Err(RegistryError::CorruptJournal(format!(
                "expected sequence {expected_seq}, found {}",
                event.sequence
            )));
        }
        if event.previous_change != self.last_change(&event.identity) {
            return Err(RegistryError::CorruptJournal(format!(
                "event {} has a broken previous_change link",
                event.sequence
            )));
        }
        if event.compute_hash(self.head_hash()) != event.hash {
            return Err(RegistryError::CorruptJournal(format!(
                "hash mismatch at event {}",
                event.sequence
            )));
        }
        Ok(self.push(event))
    }

    fn push(&mut self, event: RegistryEvent) -> &RegistryEvent {
        self.last_change.insert(event.identity, event.sequence);
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Hash of the newest event, or [`GENESIS_HASH`].
    pub fn head_hash(&self) -> &str {
        self.events
            .last()
            .map(|e| e.hash.as_str())
            .unwrap_or(GENESIS_HASH)
    }

    /// Sequence of the newest event touching `identity`.
    pub fn last_change(&self, identity: &Identity) -> Option<u64> {
        self.last_change.get(identity).copied()
    }

    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }

    pub fn get(&self, sequence: u64) -> Option<&RegistryEvent> {
        usize::try_from(sequence).ok().and_then(|i| self.events.get(i))
    }

    /// Events with `sequence >= from`.
    pub fn since(&self, from: u64) -> &[RegistryEvent] {
        let start = usize::try_from(from).unwrap_or(usize::MAX).min(self.events.len());
        &self.events[start..]
    }

    /// History of one identity, oldest first, found by following
    /// `previous_change` links from its newest event.
    pub fn for_identity(&self, identity: &Identity) -> Vec<&RegistryEvent> {
        let mut out = Vec::new();
        let mut cursor = self.last_change(identity);
        while let Some(seq) = cursor {
            match self.get(seq) {
                Some(event) => {
                    out.push(event);
                    cursor = event.previous_change;
                }
                None => break,
            }
        }
        out.reverse();
        out
    }

    /// Recompute the whole chain from genesis.
    pub fn verify_chain(&self) -> Result<()> {
        verify_chain(&self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Check that `events` form one unbroken chain from genesis.
pub fn verify_chain(events: &[RegistryEvent]) -> Result<()> {
    let mut log = EventLog::new();
    for event in events {
        log.append_verified(event.clone())?;
    }
    Ok(())
}
