//! DID document resolution.
//!
//! A resolved document is a read-only projection of registry state at one
//! instant: the controller, one verification method for the controller,
//! one per unexpired delegate, and the currently valid attribute claims.
//!
//! Delegate types map onto verification relationships:
//!
//! - `veriKey`: verification method + assertion method
//! - `sigAuth`: verification method + assertion method + authentication
//! - anything else: verification method only

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeEvent;
use crate::config::RegistryConfig;
use crate::delegate::DelegateEntry;
use crate::identity::{Identity, Tag};
use crate::time::secs_to_rfc3339;

/// JSON-LD context of resolved documents.
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Verification method type used for identity addresses.
pub const ADDRESS_METHOD_TYPE: &str = "Ed25519RegistryAddress2024";

/// A resolved DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    pub controller: String,
    #[serde(rename = "verificationMethod")]
    pub verification_method: Vec<VerificationMethod>,
    pub authentication: Vec<String>,
    #[serde(rename = "assertionMethod")]
    pub assertion_method: Vec<String>,
    pub attributes: Vec<DocumentAttribute>,
    /// Nonce of the identity at resolution time.
    pub nonce: u64,
    /// Resolution time (seconds since epoch).
    #[serde(rename = "resolvedAt")]
    pub resolved_at: u64,
}

/// A key or address entitled to act for the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    #[serde(rename = "blockchainAccountId")]
    pub account: Identity,
    #[serde(rename = "delegateType", skip_serializing_if = "Option::is_none", default)]
    pub delegate_type: Option<String>,
    /// RFC 3339 expiry for delegate methods.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expires: Option<String>,
}

/// A currently valid attribute claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAttribute {
    pub name: String,
    #[serde(with = "crate::attribute::value_hex")]
    pub value: Vec<u8>,
    #[serde(rename = "validTo")]
    pub valid_to: u64,
    pub sequence: u64,
}

impl DidDocument {
    /// Assemble a document from already-filtered registry state.
    pub fn build(
        config: &RegistryConfig,
        identity: &Identity,
        owner: &Identity,
        nonce: u64,
        delegates: &[DelegateEntry],
        attributes: &[&AttributeEvent],
        now: u64,
    ) -> Self {
        let did = config.did(identity);
        let controller_ref = format!("{did}#controller");

        let mut verification_method = vec![VerificationMethod {
            id: controller_ref.clone(),
            method_type: ADDRESS_METHOD_TYPE.to_string(),
            controller: did.clone(),
            account: *owner,
            delegate_type: None,
            expires: None,
        }];
        let mut authentication = vec![controller_ref.clone()];
        let mut assertion_method = vec![controller_ref];

        for (i, entry) in delegates.iter().enumerate() {
            let method_id = format!("{did}#delegate-{}", i + 1);
            verification_method.push(VerificationMethod {
                id: method_id.clone(),
                method_type: ADDRESS_METHOD_TYPE.to_string(),
                controller: did.clone(),
                account: entry.delegate,
                delegate_type: Some(entry.delegate_type.to_string()),
                expires: Some(secs_to_rfc3339(entry.expires_at)),
            });
            if entry.delegate_type == Tag::SIG_AUTH {
                authentication.push(method_id.clone());
                assertion_method.push(method_id);
            } else if entry.delegate_type == Tag::VERI_KEY {
                assertion_method.push(method_id);
            }
        }

        let attributes = attributes
            .iter()
            .map(|event| DocumentAttribute {
                name: event.name.to_string(),
                value: event.value.clone(),
                valid_to: event.valid_to,
                sequence: event.sequence,
            })
            .collect();

        Self {
            context: vec![DID_CONTEXT.to_string()],
            id: did,
            controller: config.did(owner),
            verification_method,
            authentication,
            assertion_method,
            attributes,
            nonce,
            resolved_at: now,
        }
    }
}
