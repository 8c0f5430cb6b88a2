//! Reading progress persistence.
//!
//! Storage is an external key-value collaborator ([`KeyValueStore`]). The
//! [`ProgressStore`] adapter on top of it is what the engine talks to: it is
//! scoped per story id, never fails, and degrades storage errors to safe
//! defaults (no saved progress, not completed).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tokio::fs;

/// Errors from a key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// String-keyed persistent storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Volatile store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// On-disk format of [`JsonFileStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    entries: BTreeMap<String, String>,
}

const STORE_VERSION: u32 = 1;

/// Key-value store kept in one JSON file.
///
/// The whole file is read on open and rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open a store, starting empty if the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str::<StoreFile>(&content)?.entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened progress file");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let file = StoreFile {
            version: STORE_VERSION,
            entries: entries.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }
}

/// Per-story reading progress and completion.
///
/// All operations are idempotent and never fail.
pub trait ProgressStore: Send + Sync {
    /// Segment id saved for the story, if any.
    fn load_progress(&self, story_id: &str) -> Option<String>;
    fn save_progress(&self, story_id: &str, segment_id: &str);
    fn clear_progress(&self, story_id: &str);
    fn is_completed(&self, story_id: &str) -> bool;
    fn set_completed(&self, story_id: &str);
    fn clear_completed(&self, story_id: &str);
}

/// Key holding the saved segment id of a story.
pub fn progress_key(story_id: &str) -> String {
    format!("story-progress-{story_id}")
}

/// Key holding the completion flag of a story.
pub fn completed_key(story_id: &str) -> String {
    format!("story-completed-{story_id}")
}

/// [`ProgressStore`] backed by any [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct StoredProgress<S> {
    store: S,
}

impl<S: KeyValueStore> StoredProgress<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn write(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.store.set(key, value),
            None => self.store.remove(key),
        };
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "progress write failed");
        }
    }
}

impl<S: KeyValueStore> ProgressStore for StoredProgress<S> {
    fn load_progress(&self, story_id: &str) -> Option<String> {
        match self.store.get(&progress_key(story_id)) {
            Ok(segment) => segment.filter(|s| !s.is_empty()),
            Err(e) => {
                tracing::warn!(story_id, error = %e, "could not read progress, starting over");
                None
            }
        }
    }

    fn save_progress(&self, story_id: &str, segment_id: &str) {
        self.write(&progress_key(story_id), Some(segment_id));
    }

    fn clear_progress(&self, story_id: &str) {
        self.write(&progress_key(story_id), None);
    }

    fn is_completed(&self, story_id: &str) -> bool {
        match self.store.get(&completed_key(story_id)) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                tracing::warn!(story_id, error = %e, "could not read completion flag");
                false
            }
        }
    }

    fn set_completed(&self, story_id: &str) {
        self.write(&completed_key(story_id), Some("true"));
    }

    fn clear_completed(&self, story_id: &str) {
        self.write(&completed_key(story_id), None);
    }
}
