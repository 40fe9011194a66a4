//! Versioned JSON persistence for wizard progress and side records.
//!
//! Every value is wrapped as `{ "version": N, "data": ... }`. Reads never
//! fail loudly: absent, unparseable or wrong-version entries load as `None`
//! and writes report success as a `bool` after logging the cause.
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use studio_core::{FlowKind, WizardProgress};
use studio_logging::{studio_debug, studio_error, studio_warn};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

/// Bumped whenever a persisted shape changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

/// Keys for records that are not per-flow progress.
pub mod keys {
    use studio_core::FlowKind;

    pub const FETCH_HISTORY: &str = "calls.fetch_history";
    pub const CTA_CACHE: &str = "cta.cache";
    pub const DISMISSED_NOTICES: &str = "notices.dismissed";
    pub const CHAT_CONVERSATION: &str = "chat.conversation_id";

    pub fn progress(flow: FlowKind) -> &'static str {
        flow.storage_key()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Raw string storage, the moral equivalent of an origin-scoped
/// `localStorage`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// One `{key}.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    writer: AtomicFileWriter,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        Ok(self.writer.dir().join(file_name(key)?))
    }
}

fn file_name(key: &str) -> Result<String, StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(format!("{key}.json"))
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writer.write(&file_name(key)?, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[derive(Serialize)]
struct EnvelopeOut<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    version: u32,
    data: Value,
}

/// Typed, versioned access to a [`KeyValueStore`].
pub struct ProgressStore {
    backend: Box<dyn KeyValueStore>,
    /// Serializes read-compare-write sequences for the newer-record guard.
    write_lock: Mutex<()>,
}

impl ProgressStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_unlocked(key, value)
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                studio_warn!("Could not read {}: {}", key, err);
                return None;
            }
        };
        let envelope: EnvelopeIn = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                studio_warn!("Ignoring corrupt entry {}: {}", key, err);
                return None;
            }
        };
        if envelope.version != SCHEMA_VERSION {
            studio_warn!(
                "Ignoring {} written with schema version {} (expected {})",
                key,
                envelope.version,
                SCHEMA_VERSION
            );
            return None;
        }
        match serde_json::from_value(envelope.data) {
            Ok(value) => Some(value),
            Err(err) => {
                studio_warn!("Ignoring entry {} with unexpected shape: {}", key, err);
                None
            }
        }
    }

    pub fn clear(&self, key: &str) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = self.backend.remove(key) {
            studio_error!("Could not clear {}: {}", key, err);
        }
    }

    /// Saves progress unless the stored record for the same flow is newer.
    pub fn save_progress(&self, progress: &WizardProgress) -> bool {
        let key = keys::progress(progress.flow);
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stored) = self.load::<WizardProgress>(key) {
            if stored.last_saved_at > progress.last_saved_at {
                studio_warn!(
                    "Refusing to overwrite {} saved at {} with older record from {}",
                    key,
                    stored.last_saved_at,
                    progress.last_saved_at
                );
                return false;
            }
        }
        self.write_unlocked(key, progress)
    }

    pub fn load_progress(&self, flow: FlowKind) -> Option<WizardProgress> {
        self.load::<WizardProgress>(keys::progress(flow))
            .filter(|progress| progress.flow == flow)
    }

    pub fn clear_progress(&self, flow: FlowKind) {
        self.clear(keys::progress(flow));
    }

    fn write_unlocked<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let envelope = EnvelopeOut {
            version: SCHEMA_VERSION,
            data: value,
        };
        let text = match serde_json::to_string(&envelope) {
            Ok(text) => text,
            Err(err) => {
                studio_error!("Could not serialize {}: {}", key, err);
                return false;
            }
        };
        match self.backend.set(key, &text) {
            Ok(()) => {
                studio_debug!("Saved {} ({} bytes)", key, text.len());
                true
            }
            Err(err) => {
                studio_error!("Could not save {}: {}", key, err);
                false
            }
        }
    }
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore").finish_non_exhaustive()
    }
}
