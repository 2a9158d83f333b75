//! Access control: the single gate every mutation passes through.
//!
//! Two authorization paths exist:
//!
//! - **Direct**: the environment vouches for the caller. The caller must be
//!   the identity's current owner. The nonce is advanced without comparison.
//! - **Signed**: an Ed25519 signature over the operation digest (see
//!   [`crate::operation`]). The recovered signer must be the current owner
//!   and the embedded nonce must equal the identity's current nonce.
//!
//! On success the nonce has been advanced and nothing else has changed.
//! On failure nothing has changed.

use serde::{Deserialize, Serialize};

use crate::crypto::keys::Ed25519KeyPair;
use crate::crypto::signing;
use crate::error::{RegistryError, Result};
use crate::identity::{Identity, IdentityLedger};
use crate::nonce::NonceGuard;
use crate::operation::Operation;

/// A meta-transaction style authorization produced off-line by the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAuthorization {
    /// Signer's Ed25519 public key (base64).
    pub signer_key: String,
    /// Nonce the signature commits to.
    pub nonce: u64,
    /// Signature over the operation digest (base64).
    pub signature: String,
}

impl SignedAuthorization {
    /// Sign `operation` on `identity` at `nonce`.
    pub fn sign(
        key: &Ed25519KeyPair,
        registry_id: &Identity,
        identity: &Identity,
        nonce: u64,
        operation: &Operation,
    ) -> Self {
        let digest = operation.signing_digest(registry_id, identity, nonce);
        Self {
            signer_key: key.public_key_base64(),
            nonce,
            signature: signing::sign_to_base64(key.signing_key(), &digest),
        }
    }

    /// Verify the signature and return the identity of the signer.
    pub fn recover_signer(
        &self,
        registry_id: &Identity,
        identity: &Identity,
        operation: &Operation,
    ) -> Result<Identity> {
        let key = Ed25519KeyPair::verifying_key_from_base64(&self.signer_key)
            .map_err(|e| RegistryError::InvalidSignature(e.to_string()))?;
        let digest = operation.signing_digest(registry_id, identity, self.nonce);
        signing::verify_from_base64(&key, &digest, &self.signature)?;
        Ok(Identity::from_verifying_key(&key))
    }
}

/// How a mutation is authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum Authorization {
    Direct { caller: Identity },
    Signed(SignedAuthorization),
}

impl Authorization {
    pub fn direct(caller: Identity) -> Self {
        Self::Direct { caller }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Signed(_) => "signed",
        }
    }
}

/// Outcome of a successful authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorized {
    /// The owner who authorized the mutation.
    pub actor: Identity,
    /// The identity's nonce after advancing.
    pub nonce: u64,
}

/// Authorizes mutations for one registry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessControl {
    registry_id: Identity,
}

impl AccessControl {
    pub fn new(registry_id: Identity) -> Self {
        Self { registry_id }
    }

    pub fn registry_id(&self) -> &Identity {
        &self.registry_id
    }

    /// Check `authorization` for `operation` on `identity` and advance the
    /// nonce on success.
    pub fn authorize(
        &self,
        ledger: &IdentityLedger,
        nonces: &mut NonceGuard,
        identity: &Identity,
        operation: &Operation,
        authorization: &Authorization,
    ) -> Result<Authorized> {
        let owner = ledger.owner_of(identity);
        match authorization {
            Authorization::Direct { caller } => {
                if *caller != owner {
                    return Err(RegistryError::NotOwner {
                        identity: *identity,
                        caller: *caller,
                    });
                }
                let nonce = nonces.check_and_advance(identity, None)?;
                Ok(Authorized {
                    actor: *caller,
                    nonce,
                })
            }
            Authorization::Signed(signed) => {
                let signer = signed.recover_signer(&self.registry_id, identity, operation)?;
                if signer != owner {
                    return Err(RegistryError::InvalidSignature(format!(
                        "signer {signer} is not the owner of {identity}"
                    )));
                }
                let nonce = nonces.check_and_advance(identity, Some(signed.nonce))?;
                Ok(Authorized {
                    actor: signer,
                    nonce,
                })
            }
        }
    }
}
