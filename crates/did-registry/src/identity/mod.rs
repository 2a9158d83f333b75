//! Identities, fixed-width tags, and the ownership ledger.
//!
//! An identity exists the moment it is referenced and is owned by itself
//! until an authorized `change_owner` says otherwise.

pub mod address;
pub mod ledger;
pub mod tag;

pub use address::{Identity, IDENTITY_LEN};
pub use ledger::IdentityLedger;
pub use tag::{Tag, TAG_LEN};
