//! Ed25519 signing and verification over registry digests.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

use crate::error::{RegistryError, Result};

/// Sign a message with an Ed25519 signing key.
pub fn sign(signing_key: &SigningKey, message: &[u8]) -> Signature {
    signing_key.sign(message)
}

/// Verify a signature against a public key and message.
pub fn verify(verifying_key: &VerifyingKey, message: &[u8], signature: &Signature) -> Result<()> {
    verifying_key
        .verify_strict(message, signature)
        .map_err(|_| RegistryError::InvalidSignature("signature does not verify".into()))
}

/// Sign a message and return the signature as base64.
pub fn sign_to_base64(signing_key: &SigningKey, message: &[u8]) -> String {
    let sig = sign(signing_key, message);
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, sig.to_bytes())
}

/// Verify a base64-encoded signature.
pub fn verify_from_base64(
    verifying_key: &VerifyingKey,
    message: &[u8],
    signature_b64: &str,
) -> Result<()> {
    let sig_bytes =
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, signature_b64)
            .map_err(|e| RegistryError::InvalidSignature(format!("invalid base64 signature: {e}")))?;

    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| RegistryError::InvalidSignature("signature must be 64 bytes".into()))?;

    verify(verifying_key, message, &Signature::from_bytes(&sig_array))
}
