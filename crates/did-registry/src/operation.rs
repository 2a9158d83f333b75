//! Mutations and their canonical signing digest.
//!
//! A signed authorization covers the digest of:
//!
//! ```text
//! 0x19 0x00 || registry_id (20) || nonce (u64 BE) || identity (20)
//!           || operation name (ASCII) || operation payload
//! ```
//!
//! hashed with SHA-256. Payload layouts:
//!
//! | operation         | payload                                   |
//! |-------------------|-------------------------------------------|
//! | `changeOwner`     | new owner (20)                            |
//! | `addDelegate`     | type (32) ‖ delegate (20) ‖ validity (8)  |
//! | `revokeDelegate`  | type (32) ‖ delegate (20)                 |
//! | `setAttribute`    | name (32) ‖ value ‖ validity (8)          |
//! | `revokeAttribute` | name (32) ‖ value                         |

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::identity::{Identity, Tag};

const SIGNING_PREFIX: [u8; 2] = [0x19, 0x00];

/// A state-changing request against one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    ChangeOwner {
        new_owner: Identity,
    },
    AddDelegate {
        delegate_type: Tag,
        delegate: Identity,
        /// Seconds from now.
        validity: u64,
    },
    RevokeDelegate {
        delegate_type: Tag,
        delegate: Identity,
    },
    SetAttribute {
        name: Tag,
        #[serde(with = "crate::attribute::value_hex")]
        value: Vec<u8>,
        /// Seconds from now.
        validity: u64,
    },
    RevokeAttribute {
        name: Tag,
        #[serde(with = "crate::attribute::value_hex")]
        value: Vec<u8>,
    },
}

impl Operation {
    /// Stable operation name bound into the signing digest.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChangeOwner { .. } => "changeOwner",
            Self::AddDelegate { .. } => "addDelegate",
            Self::RevokeDelegate { .. } => "revokeDelegate",
            Self::SetAttribute { .. } => "setAttribute",
            Self::RevokeAttribute { .. } => "revokeAttribute",
        }
    }

    /// Reject identity arguments that are empty.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::ChangeOwner { new_owner } => {
                new_owner.require_non_empty("new owner")?;
            }
            Self::AddDelegate { delegate, .. } | Self::RevokeDelegate { delegate, .. } => {
                delegate.require_non_empty("delegate")?;
            }
            Self::SetAttribute { .. } | Self::RevokeAttribute { .. } => {}
        }
        Ok(())
    }

    fn payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::ChangeOwner { new_owner } => out.extend_from_slice(new_owner.as_bytes()),
            Self::AddDelegate {
                delegate_type,
                delegate,
                validity,
            } => {
                out.extend_from_slice(delegate_type.as_bytes());
                out.extend_from_slice(delegate.as_bytes());
                out.extend_from_slice(&validity.to_be_bytes());
            }
            Self::RevokeDelegate {
                delegate_type,
                delegate,
            } => {
                out.extend_from_slice(delegate_type.as_bytes());
                out.extend_from_slice(delegate.as_bytes());
            }
            Self::SetAttribute {
                name,
                value,
                validity,
            } => {
                out.extend_from_slice(name.as_bytes());
                out.extend_from_slice(value);
                out.extend_from_slice(&validity.to_be_bytes());
            }
            Self::RevokeAttribute { name, value } => {
                out.extend_from_slice(name.as_bytes());
                out.extend_from_slice(value);
            }
        }
        out
    }

    /// Digest a signer must sign to authorize this operation on
    /// `identity` at `nonce` in the registry `registry_id`.
    pub fn signing_digest(&self, registry_id: &Identity, identity: &Identity, nonce: u64) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(SIGNING_PREFIX);
        hasher.update(registry_id.as_bytes());
        hasher.update(nonce.to_be_bytes());
        hasher.update(identity.as_bytes());
        hasher.update(self.name().as_bytes());
        hasher.update(self.payload());
        hasher.finalize().into()
    }
}
