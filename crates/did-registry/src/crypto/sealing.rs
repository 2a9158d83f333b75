//! Passphrase sealing for key material at rest.
//!
//! passphrase → Argon2id(passphrase, salt) → master key
//! HKDF-SHA256(master key, context) → sealing key
//! ChaCha20-Poly1305(sealing key, nonce) → ciphertext
//!
//! The context string binds a sealed box to its purpose so that a box
//! written for one file type cannot be opened as another.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{RegistryError, Result};

const ARGON2_M_COST: u32 = 65536; // 64 MiB
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;

/// Salt, nonce and ciphertext of a sealed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under a key derived from `passphrase` and `context`.
pub fn seal(passphrase: &[u8], context: &str, plaintext: &[u8]) -> Result<SealedBox> {
    let mut salt = [0u8; 16];
    let mut nonce = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce);

    let key = sealing_key(passphrase, &salt, context)?;
    let cipher = ChaCha20Poly1305::new_from_slice(key.as_slice())
        .map_err(|e| RegistryError::EncryptionFailed(format!("cipher init: {e}")))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| RegistryError::EncryptionFailed(format!("encrypt: {e}")))?;

    Ok(SealedBox {
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt a sealed box. A wrong passphrase or context fails AEAD
/// authentication and is reported as `InvalidPassphrase`.
pub fn open(passphrase: &[u8], context: &str, sealed: &SealedBox) -> Result<Zeroizing<Vec<u8>>> {
    let key = sealing_key(passphrase, &sealed.salt, context)?;
    let cipher = ChaCha20Poly1305::new_from_slice(key.as_slice())
        .map_err(|e| RegistryError::DecryptionFailed(format!("cipher init: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| RegistryError::InvalidPassphrase)
}

fn sealing_key(passphrase: &[u8], salt: &[u8; 16], context: &str) -> Result<Zeroizing<[u8; 32]>> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(32))
        .map_err(|e| RegistryError::DerivationFailed(format!("Argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut master = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase, salt, master.as_mut_slice())
        .map_err(|e| RegistryError::DerivationFailed(format!("Argon2 hash: {e}")))?;

    let hk = Hkdf::<Sha256>::new(None, master.as_slice());
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(context.as_bytes(), key.as_mut_slice())
        .map_err(|e| RegistryError::DerivationFailed(format!("HKDF expand failed: {e}")))?;
    Ok(key)
}
