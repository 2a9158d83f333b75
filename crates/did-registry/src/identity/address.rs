//! Identity addresses: the fixed-width subjects of the registry.
//!
//! An identity is 20 opaque bytes. Keys map onto identities by hashing:
//! the identity of an Ed25519 public key is the last 20 bytes of
//! SHA-256(public_key).

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{RegistryError, Result};

/// Width of an identity in bytes.
pub const IDENTITY_LEN: usize = 20;

/// An address-like identifier. Its owner defaults to itself.
///
/// Rendered as `0x` followed by 40 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identity(pub [u8; IDENTITY_LEN]);

impl Identity {
    /// The all-zero identity. Never a valid operation argument.
    pub const ZERO: Identity = Identity([0u8; IDENTITY_LEN]);

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from a slice that must be exactly 20 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; IDENTITY_LEN] = bytes.try_into().map_err(|_| {
            RegistryError::MalformedInput(format!(
                "identity must be {IDENTITY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Compute the identity controlled by an Ed25519 public key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let hash = Sha256::digest(key.as_bytes());
        let mut out = [0u8; IDENTITY_LEN];
        out.copy_from_slice(&hash[32 - IDENTITY_LEN..]);
        Self(out)
    }

    /// Deterministically derive an identity from a label.
    ///
    /// Used for registry identifiers and fixtures, never for key-holding
    /// identities.
    pub fn from_label(label: &str) -> Self {
        let hash = Sha256::digest(label.as_bytes());
        let mut out = [0u8; IDENTITY_LEN];
        out.copy_from_slice(&hash[..IDENTITY_LEN]);
        Self(out)
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// True for the all-zero identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; IDENTITY_LEN]
    }

    /// Reject the empty identity as an operation argument.
    pub fn require_non_empty(self, role: &str) -> Result<Self> {
        if self.is_zero() {
            return Err(RegistryError::MalformedInput(format!(
                "{role} must not be the empty identity"
            )));
        }
        Ok(self)
    }

    /// Render as a DID, e.g. `did:ethr:0xabc…` or `did:ethr:goerli:0xabc…`.
    pub fn to_did(&self, method: &str, network: Option<&str>) -> String {
        match network {
            Some(net) if !net.is_empty() => format!("did:{method}:{net}:{self}"),
            _ => format!("did:{method}:{self}"),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({self})")
    }
}

impl FromStr for Identity {
    type Err = RegistryError;

    /// Accepts `0x…`, bare hex, or a DID whose last segment is an address.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = if s.starts_with("did:") {
            s.rsplit(':').next().unwrap_or_default()
        } else {
            s
        };
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != IDENTITY_LEN * 2 {
            return Err(RegistryError::MalformedInput(format!(
                "identity must be {} hex digits: {s}",
                IDENTITY_LEN * 2
            )));
        }
        let bytes = hex::decode(digits)
            .map_err(|e| RegistryError::MalformedInput(format!("invalid identity hex: {e}")))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
