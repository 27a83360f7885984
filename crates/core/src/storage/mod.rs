//! Client-local key-value persistence. Failures here are never fatal; callers
//! log them and carry on.

pub mod watchlist;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub use watchlist::Watchlist;

#[derive(Debug, Clone)]
pub struct PersistenceWarning {
    pub key: String,
    pub detail: String,
}

impl PersistenceWarning {
    pub fn new(key: &str, detail: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for PersistenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local store error (key={}): {}", self.key, self.detail)
    }
}

impl std::error::Error for PersistenceWarning {}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceWarning>;

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceWarning>;
}

/// A JSON object of string values kept in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self, key: &str) -> Result<BTreeMap<String, String>, PersistenceWarning> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(PersistenceWarning::new(
                    key,
                    format!("failed to read {}: {e}", self.path.display()),
                ))
            }
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            PersistenceWarning::new(key, format!("{} is not a valid store: {e}", self.path.display()))
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceWarning> {
        Ok(self.read_all(key)?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceWarning> {
        let mut all = match self.read_all(key) {
            Ok(all) => all,
            Err(warning) => {
                tracing::warn!(%warning, "discarding unreadable store contents");
                BTreeMap::new()
            }
        };
        all.insert(key.to_string(), value.to_string());

        let body = serde_json::to_string_pretty(&all)
            .map_err(|e| PersistenceWarning::new(key, format!("failed to encode store: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PersistenceWarning::new(key, format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        // Write then rename so a crash never leaves a half-written store.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                PersistenceWarning::new(key, format!("failed to write {}: {e}", self.path.display()))
            })
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceWarning> {
        let values = self
            .values
            .lock()
            .map_err(|_| PersistenceWarning::new(key, "memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceWarning> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| PersistenceWarning::new(key, "memory store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
