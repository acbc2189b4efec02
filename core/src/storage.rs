//! Persisted key-value storage for client credentials.
//!
//! # Design
//! `TokenStorage` plays the role of the browser's local storage: string
//! values under string keys, read fresh every time a request is dispatched.
//! Reads never fail; an unreadable backing store reads as empty so a
//! request simply goes out without credentials.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

/// Default key under which the access token (or session JSON) is stored.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("storage encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage on a lock-free map. Clones share the same map.
#[derive(Clone)]
pub struct MemoryStorage {
    values: Arc<papaya::HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            values: Arc::new(papaya::HashMap::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("keys", &self.values.pin().len())
            .finish()
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.pin().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.pin().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.pin().remove(key);
        Ok(())
    }
}

/// One write lock per storage file path, shared by every `FileStorage`
/// in the process.
static WRITE_LOCKS: OnceLock<papaya::HashMap<PathBuf, Arc<Mutex<()>>>> = OnceLock::new();

fn write_lock(path: &Path) -> Arc<Mutex<()>> {
    let locks = WRITE_LOCKS.get_or_init(papaya::HashMap::new);
    Arc::clone(locks.pin().get_or_insert_with(path.to_path_buf(), Default::default))
}

/// Storage backed by a JSON object file, e.g. `~/.config/rental/storage.json`.
///
/// The file is re-read on every `get`, so a token written by another process
/// is picked up by the next request. Writers in this process are serialized
/// per path across load, modify and save; each save goes to a uniquely named
/// sibling temp file that is persisted over the original.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load for a write. A corrupt file is replaced rather than blocking
    /// every future login.
    fn load_for_write(&self) -> Result<HashMap<String, String>, StorageError> {
        match self.load() {
            Err(StorageError::Encoding(e)) => {
                warn!(path = %self.path.display(), error = %e, "discarding corrupt storage file");
                Ok(HashMap::new())
            }
            other => other,
        }
    }

    fn save(&self, values: &HashMap<String, String>) -> Result<(), StorageError> {
        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&serde_json::to_vec_pretty(values)?)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Load, apply `change`, and save while holding the path's write lock.
    /// Nothing is written when `change` returns false.
    fn update(&self, change: impl FnOnce(&mut HashMap<String, String>) -> bool) -> Result<(), StorageError> {
        let lock = write_lock(&self.path);
        let _guard: MutexGuard<'_, ()> = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.load_for_write()?;
        if change(&mut values) {
            self.save(&values)?;
        }
        Ok(())
    }
}

impl TokenStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut values) => values.remove(key),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "storage unreadable, treating as empty");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|values| values.remove(key).is_some())
    }
}
