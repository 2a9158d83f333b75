//! Fixed-width tags for delegate types and attribute names.
//!
//! A tag is 32 bytes. Short labels are right-padded with zeros; anything
//! longer than 32 bytes is rejected rather than silently cut. Callers that
//! want truncation ask for it with [`Tag::truncated`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RegistryError, Result};

/// Width of a tag in bytes.
pub const TAG_LEN: usize = 32;

const fn pad(label: &[u8]) -> [u8; TAG_LEN] {
    let mut out = [0u8; TAG_LEN];
    let mut i = 0;
    while i < label.len() && i < TAG_LEN {
        out[i] = label[i];
        i += 1;
    }
    out
}

/// A 32-byte opaque tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Tag(pub [u8; TAG_LEN]);

impl Tag {
    /// Delegate type for keys that may verify signatures on behalf of an identity.
    pub const VERI_KEY: Tag = Tag(pad(b"veriKey"));

    /// Delegate type for keys that may authenticate as an identity.
    pub const SIG_AUTH: Tag = Tag(pad(b"sigAuth"));

    /// Build a tag from at most 32 bytes, right-padding with zeros.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > TAG_LEN {
            return Err(RegistryError::MalformedInput(format!(
                "tag exceeds {TAG_LEN} bytes ({} given)",
                bytes.len()
            )));
        }
        Ok(Self(pad(bytes)))
    }

    /// Build a tag from a text label.
    pub fn from_label(label: &str) -> Result<Self> {
        Self::new(label.as_bytes())
    }

    /// Build a tag keeping only the first 32 bytes.
    pub fn truncated(bytes: &[u8]) -> Self {
        Self(pad(bytes))
    }

    /// Parse a `0x`-prefixed hex tag of at most 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| RegistryError::MalformedInput(format!("invalid tag hex: {e}")))?;
        Self::new(&bytes)
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }

    /// The tag bytes without trailing zero padding.
    pub fn trimmed(&self) -> &[u8] {
        let end = self.0.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        &self.0[..end]
    }

    /// Render the trimmed bytes as text (lossy).
    pub fn label(&self) -> String {
        String::from_utf8_lossy(self.trimmed()).into_owned()
    }

    /// Full-width `0x` hex rendering.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    fn is_printable(&self) -> bool {
        let t = self.trimmed();
        !t.is_empty() && t.iter().all(|b| b.is_ascii_graphic() || *b == b' ')
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_printable() {
            f.write_str(&self.label())
        } else {
            f.write_str(&self.to_hex())
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl FromStr for Tag {
    type Err = RegistryError;

    /// Full-width hex (`0x` + 64 digits) is decoded; anything else is a label.
    fn from_str(s: &str) -> Result<Self> {
        if s.len() == 2 + TAG_LEN * 2 && s.starts_with("0x") {
            Self::from_hex(s)
        } else {
            Self::from_label(s)
        }
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
