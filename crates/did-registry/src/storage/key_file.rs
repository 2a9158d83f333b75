//! `.didkey` files — passphrase-sealed signing keys.
//!
//! The signing key is sealed with [`crate::crypto::sealing`]; the identity
//! and public key stay in plaintext so a key file can be listed without
//! the passphrase.
//!
//! File format (JSON):
//! ```json
//! {
//!     "version": 1,
//!     "format": "didkey-v1",
//!     "identity": "0x…",
//!     "public_key": "<base64>",
//!     "name": "alice",
//!     "created_at": 1700000000,
//!     "encryption": {
//!         "algorithm": "chacha20-poly1305",
//!         "kdf": "argon2id+hkdf-sha256",
//!         "salt": "<base64-16-bytes>",
//!         "nonce": "<base64-12-bytes>"
//!     },
//!     "encrypted_key": "<base64-ciphertext>"
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::keys::Ed25519KeyPair;
use crate::crypto::sealing::{self, SealedBox};
use crate::error::{RegistryError, Result};
use crate::identity::Identity;

use super::write_atomic;

const KEY_FILE_VERSION: u32 = 1;
const KEY_FILE_FORMAT: &str = "didkey-v1";
const KEY_ALGORITHM: &str = "chacha20-poly1305";
const KEY_KDF: &str = "argon2id+hkdf-sha256";

/// Sealing context. Must remain stable across versions.
const KEY_SEALING_CONTEXT: &str = "did-registry/signing-key";

/// Extension used for key files.
pub const KEY_FILE_EXTENSION: &str = "didkey";

/// Top-level structure of a `.didkey` file.
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    version: u32,
    format: String,
    #[serde(flatten)]
    info: KeyInfo,
    encryption: EncryptionMetadata,
    encrypted_key: String,
}

/// Public part of a key file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub identity: Identity,
    pub public_key: String,
    pub name: Option<String>,
    pub created_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncryptionMetadata {
    algorithm: String,
    kdf: String,
    salt: String,
    nonce: String,
}

fn b64(bytes: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)
}

fn unb64(field: &str, encoded: &str) -> Result<Vec<u8>> {
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
        .map_err(|e| RegistryError::InvalidFileFormat(format!("invalid {field} base64: {e}")))
}

/// Seal `key` with `passphrase` and write it to `path`.
pub fn save_key(key: &Ed25519KeyPair, name: Option<&str>, path: &Path, passphrase: &str) -> Result<KeyInfo> {
    let secret = key.signing_key_bytes();
    let sealed = sealing::seal(passphrase.as_bytes(), KEY_SEALING_CONTEXT, secret.as_slice())?;

    let info = KeyInfo {
        identity: key.identity(),
        public_key: key.public_key_base64(),
        name: name.map(str::to_string),
        created_at: crate::time::now_secs(),
    };
    let file = KeyFile {
        version: KEY_FILE_VERSION,
        format: KEY_FILE_FORMAT.to_string(),
        info: info.clone(),
        encryption: EncryptionMetadata {
            algorithm: KEY_ALGORITHM.to_string(),
            kdf: KEY_KDF.to_string(),
            salt: b64(&sealed.salt),
            nonce: b64(&sealed.nonce),
        },
        encrypted_key: b64(&sealed.ciphertext),
    };

    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| RegistryError::SerializationError(e.to_string()))?;
    write_atomic(path, json.as_bytes())?;
    Ok(info)
}

/// Unseal the key stored at `path`.
///
/// # Errors
///
/// `InvalidPassphrase` when the passphrase is wrong, `InvalidFileFormat`
/// for malformed files, `InvalidKey` when the unsealed key does not match
/// the recorded identity.
pub fn load_key(path: &Path, passphrase: &str) -> Result<Ed25519KeyPair> {
    let file = read_file(path)?;

    let sealed = SealedBox {
        salt: unb64("salt", &file.encryption.salt)?
            .try_into()
            .map_err(|_| RegistryError::InvalidFileFormat("salt must be 16 bytes".into()))?,
        nonce: unb64("nonce", &file.encryption.nonce)?
            .try_into()
            .map_err(|_| RegistryError::InvalidFileFormat("nonce must be 12 bytes".into()))?,
        ciphertext: unb64("encrypted_key", &file.encrypted_key)?,
    };
    let secret = sealing::open(passphrase.as_bytes(), KEY_SEALING_CONTEXT, &sealed)?;
    let bytes: &[u8; 32] = secret
        .as_slice()
        .try_into()
        .map_err(|_| RegistryError::InvalidKey("signing key must be 32 bytes".into()))?;

    let key = Ed25519KeyPair::from_signing_key_bytes(bytes);
    if key.identity() != file.info.identity {
        return Err(RegistryError::InvalidKey(format!(
            "key does not control recorded identity {}",
            file.info.identity
        )));
    }
    Ok(key)
}

/// Read the public part of a key file without the passphrase.
pub fn read_key_info(path: &Path) -> Result<KeyInfo> {
    Ok(read_file(path)?.info)
}

fn read_file(path: &Path) -> Result<KeyFile> {
    if !path.exists() {
        return Err(RegistryError::NotFound(format!("key file {}", path.display())));
    }
    let bytes = std::fs::read(path)?;
    let file: KeyFile = serde_json::from_slice(&bytes).map_err(|e| {
        RegistryError::InvalidFileFormat(format!("failed to parse key file: {e}"))
    })?;
    if file.version != KEY_FILE_VERSION || file.format != KEY_FILE_FORMAT {
        return Err(RegistryError::InvalidFileFormat(format!(
            "unsupported key file version={} format={}",
            file.version, file.format
        )));
    }
    Ok(file)
}
