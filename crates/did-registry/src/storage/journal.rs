//! Event journal persistence.
//!
//! The journal is the durable record of a registry: the full event stream
//! in one JSON file. Owner, nonce, delegate and attribute state are never
//! stored; they are rebuilt by replaying the journal.
//!
//! File format:
//! ```json
//! { "version": 1, "head_hash": "<hex>", "events": [ ... RegistryEvent ... ] }
//! ```
//!
//! Saving refuses to rewrite history: the events already on disk must be
//! a prefix of the events being saved.

use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::event::{verify_chain, RegistryEvent, GENESIS_HASH};
use crate::registry::DidRegistry;
use crate::time::Clock;

use super::write_atomic;

const JOURNAL_VERSION: u32 = 1;

/// On-disk structure of a journal file.
#[derive(Debug, Serialize, Deserialize)]
struct JournalFile {
    version: u32,
    /// Hash of the last event; guards against truncation.
    head_hash: String,
    events: Vec<RegistryEvent>,
}

/// A journal file at a fixed path.
#[derive(Debug, Clone)]
pub struct EventJournal {
    path: PathBuf,
}

impl EventJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and verify the journal. An absent file is an empty stream.
    ///
    /// # Errors
    ///
    /// `InvalidFileFormat` for unparseable or unsupported files,
    /// `CorruptJournal` when the hash chain or head hash does not check out.
    pub fn load(&self) -> Result<Vec<RegistryEvent>> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(&self.path)?;
        let file: JournalFile = serde_json::from_slice(&bytes).map_err(|e| {
            RegistryError::InvalidFileFormat(format!(
                "failed to parse journal {}: {e}",
                self.path.display()
            ))
        })?;

        if file.version != JOURNAL_VERSION {
            return Err(RegistryError::InvalidFileFormat(format!(
                "unsupported journal version {}",
                file.version
            )));
        }

        verify_chain(&file.events)?;
        let head = file
            .events
            .last()
            .map(|e| e.hash.as_str())
            .unwrap_or(GENESIS_HASH);
        if head != file.head_hash {
            return Err(RegistryError::CorruptJournal(
                "head hash does not match the last event".into(),
            ));
        }

        info!("loaded {} events from {}", file.events.len(), self.path.display());
        Ok(file.events)
    }

    /// Write `events` atomically. The events already on disk must be a
    /// prefix of `events`.
    pub fn save(&self, events: &[RegistryEvent]) -> Result<()> {
        let existing = self.load()?;
        if existing.len() > events.len()
            || existing
                .last()
                .is_some_and(|last| events[existing.len() - 1].hash != last.hash)
        {
            return Err(RegistryError::StorageError(format!(
                "refusing to rewrite journal {}: on-disk history diverges",
                self.path.display()
            )));
        }

        let file = JournalFile {
            version: JOURNAL_VERSION,
            head_hash: events
                .last()
                .map(|e| e.hash.clone())
                .unwrap_or_else(|| GENESIS_HASH.to_string()),
            events: events.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| RegistryError::SerializationError(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes())?;

        info!(
            "saved {} events ({} new) to {}",
            events.len(),
            events.len() - existing.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Rebuild a registry from this journal.
    pub fn open_registry<C: Clock>(&self, config: RegistryConfig, clock: C) -> Result<DidRegistry<C>> {
        DidRegistry::from_events(config, clock, self.load()?)
    }

    /// Persist the event stream of `registry`.
    pub fn commit<C: Clock>(&self, registry: &DidRegistry<C>) -> Result<()> {
        self.save(registry.events().events())
    }
}
