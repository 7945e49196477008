//! Durable token storage.
//!
//! DESIGN
//! ======
//! The session manager is the only writer. Readers never cache a token: they
//! call `load` each time, so a refresh or logout is visible immediately.
//! `FileTokenStore` keeps the whole key map in one small JSON file and
//! rewrites it on every change. A rewrite goes to a sibling temp file that
//! is renamed over the original, so readers see the old map or the new one,
//! never a torn write. On unix the file is created owner-only (0600).

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::types::SessionError;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Key/value storage for the session's token pair.
pub trait TokenStore: Send + Sync {
    /// Read a stored value, `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the backing storage is unreadable.
    fn load(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Store a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the value cannot be persisted.
    fn save(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Remove a key. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the change cannot be persisted.
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>, SessionError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON-file store, the CLI's counterpart to browser local storage.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, SessionError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(storage_error(&self.path, &e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| storage_error(&self.path, &e))
    }

    fn write_map(&self, values: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if values.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(storage_error(&self.path, &e)),
            };
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, &e))?;
        }
        let rendered = serde_json::to_string_pretty(values).map_err(|e| storage_error(&self.path, &e))?;

        let staging = self.staging_path();
        let written = write_private(&staging, rendered.as_bytes())
            .and_then(|()| std::fs::rename(&staging, &self.path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&staging);
            return Err(storage_error(&self.path, &e));
        }
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let name = self.path.file_name().map_or_else(|| "tokens".into(), |n| n.to_string_lossy().into_owned());
        self.path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), SessionError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.read_map()?;
        apply(&mut values);
        self.write_map(&values)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.read_map()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.update(|values| {
            values.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn storage_error(path: &Path, error: &dyn std::fmt::Display) -> SessionError {
    SessionError::Storage(format!("{}: {error}", path.display()))
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
