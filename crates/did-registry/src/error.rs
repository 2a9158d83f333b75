//! Error types for the DID registry.
//!
//! All errors are strongly typed and propagated without panicking.
//! Every rejection happens before any state is touched, so a caller that
//! receives an error can assume the registry is unchanged.
//! Private key material is never included in error messages.

use crate::identity::Identity;

/// Registry error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Caller {caller} is not the owner of {identity}")]
    NotOwner { identity: Identity, caller: Identity },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Replay rejected for {identity}: expected nonce {expected}, presented {presented}")]
    ReplayRejected {
        identity: Identity,
        expected: u64,
        presented: u64,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid passphrase")]
    InvalidPassphrase,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt journal: {0}")]
    CorruptJournal(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// True for the four authorization/input rejections a caller may
    /// resubmit after correcting (fresh nonce, right key, fixed input).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NotOwner { .. }
                | Self::InvalidSignature(_)
                | Self::ReplayRejected { .. }
                | Self::MalformedInput(_)
        )
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, RegistryError>;
