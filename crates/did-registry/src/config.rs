//! Registry configuration.
//!
//! Stored as `registry.json` next to the journal. Every field has a
//! default, so an absent file or a partial file is fine:
//!
//! ```json
//! { "registry_id": "0x…", "did_method": "ethr", "network": "sepolia" }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::identity::Identity;
use crate::storage::write_atomic;

/// Label the default registry identifier is derived from.
pub const DEFAULT_REGISTRY_LABEL: &str = "did-registry/default";

/// Default DID method name.
pub const DEFAULT_DID_METHOD: &str = "ethr";

/// Configuration of one registry instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Bound into every signed authorization so signatures cannot be
    /// replayed against another registry.
    pub registry_id: Identity,
    /// Method segment of rendered DIDs.
    pub did_method: String,
    /// Optional network segment of rendered DIDs.
    pub network: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_id: Identity::from_label(DEFAULT_REGISTRY_LABEL),
            did_method: DEFAULT_DID_METHOD.to_string(),
            network: None,
        }
    }
}

impl RegistryConfig {
    pub fn with_registry_id(mut self, registry_id: Identity) -> Self {
        self.registry_id = registry_id;
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Render `identity` as a DID under this configuration.
    pub fn did(&self, identity: &Identity) -> String {
        identity.to_did(&self.did_method, self.network.as_deref())
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            RegistryError::InvalidFileFormat(format!(
                "failed to parse config {}: {e}",
                path.display()
            ))
        })
    }

    /// Write to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RegistryError::SerializationError(e.to_string()))?;
        write_atomic(path, json.as_bytes())
    }
}
