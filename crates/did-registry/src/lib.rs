//! DidRegistry — a decentralized identity registry.
//!
//! Tracks, per identity, a controlling owner, typed time-bounded delegate
//! authorizations, and an append-only log of time-bounded attribute
//! claims. Every state change is authorized by the current owner, either
//! directly or through an off-line Ed25519 signature bound to a
//! per-identity nonce, and is recorded as a hash-chained event from which
//! the whole state can be rebuilt.

pub mod access;
pub mod attribute;
pub mod config;
pub mod crypto;
pub mod delegate;
pub mod document;
pub mod error;
pub mod event;
pub mod identity;
pub mod nonce;
pub mod operation;
pub mod registry;
pub mod storage;
pub mod time;

// Re-export primary types
pub use access::{Authorization, Authorized, SignedAuthorization};
pub use attribute::{AttributeEvent, AttributeLog};
pub use config::RegistryConfig;
pub use crypto::keys::Ed25519KeyPair;
pub use delegate::{DelegateChange, DelegateEntry, DelegateKey};
pub use document::DidDocument;
pub use error::{RegistryError, Result};
pub use event::{EventKind, RegistryEvent};
pub use identity::{Identity, Tag};
pub use operation::Operation;
pub use registry::DidRegistry;
pub use time::{Clock, ManualClock, SystemClock};
