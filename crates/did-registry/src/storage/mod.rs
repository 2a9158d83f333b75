//! Storage layer for the event journal, configuration and key files.
//!
//! # Directory layout
//!
//! By convention the default root is `~/.did-registry/`:
//!
//! ```text
//! ~/.did-registry/
//! ├── registry.json       — RegistryConfig
//! ├── journal.json        — event stream
//! └── keys/
//!     └── {name}.didkey
//! ```
//!
//! # Modules
//!
//! - [`journal`]: append-only persistence of the event stream.
//! - [`key_file`]: `.didkey` save/load with passphrase sealing.

use std::path::Path;

use crate::error::Result;

pub mod journal;
pub mod key_file;

pub use journal::EventJournal;
pub use key_file::{load_key, read_key_info, save_key, KeyInfo, KEY_FILE_EXTENSION};

/// Write `data` to `path` through a sibling temp file and a rename, so a
/// crash never leaves a partially written file behind.
///
/// Creates the parent directory if needed.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
