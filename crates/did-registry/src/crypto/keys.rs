//! Ed25519 key pairs for identities that sign authorizations.
//!
//! The registry itself holds no keys. Key pairs exist on the client side
//! to produce signed authorizations and to derive the identity a key
//! controls.

use ed25519_dalek::{SigningKey, VerifyingKey};
use zeroize::Zeroizing;

use crate::error::{RegistryError, Result};
use crate::identity::Identity;

/// An Ed25519 key pair.
///
/// `SigningKey` wipes its secret on drop.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Ed25519KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut rand::thread_rng()))
    }

    /// Wrap an existing signing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a key pair from raw signing key bytes.
    pub fn from_signing_key_bytes(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    /// Reconstruct a verifying key from raw bytes.
    pub fn verifying_key_from_bytes(bytes: &[u8; 32]) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(bytes)
            .map_err(|e| RegistryError::InvalidKey(format!("invalid verifying key: {e}")))
    }

    /// Decode a base64 verifying key.
    pub fn verifying_key_from_base64(encoded: &str) -> Result<VerifyingKey> {
        let raw = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
            .map_err(|e| RegistryError::InvalidKey(format!("invalid base64 public key: {e}")))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| RegistryError::InvalidKey("public key must be 32 bytes".into()))?;
        Self::verifying_key_from_bytes(&bytes)
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// The identity this key controls by default.
    pub fn identity(&self) -> Identity {
        Identity::from_verifying_key(&self.verifying_key)
    }

    /// Signing key bytes, wiped when the returned buffer drops.
    pub fn signing_key_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Public key as standard base64.
    pub fn public_key_base64(&self) -> String {
        base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            self.verifying_key_bytes(),
        )
    }
}
