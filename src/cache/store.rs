//! File-backed key-value store with compute-on-miss
//!
//! Provides a `CacheStore` that keeps an in-memory mapping in lockstep with a
//! single file on disk. Every mutation rewrites the whole backing file before
//! returning, so a value that was stored successfully survives process
//! restarts. The on-disk format is an implementation detail of this module.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while opening or using a cache store
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing path is occupied by something other than a regular file
    #[error("{} exists but is not a file", .0.display())]
    NotAFile(PathBuf),

    /// Reading or writing the backing file failed
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file does not contain a serialized mapping
    #[error("cache file is not a valid serialized mapping: {0}")]
    Format(#[from] serde_json::Error),

    /// A key required to be present was absent
    #[error("key '{0}' not present in cache")]
    KeyNotFound(String),
}

/// A persistent cache that synchronizes its in-memory state with a file on disk.
///
/// The in-memory mapping is the authoritative read source; reads never touch
/// disk. Writes go through `set`, which replaces the backing file in full
/// before returning. There is no locking: concurrent writers racing on the
/// same path will lose updates, so callers needing several logical caches
/// should open one store per backing file.
pub struct CacheStore {
    /// Path of the backing file, fixed at construction
    location: PathBuf,
    /// In-memory mirror of the backing file
    entries: Map<String, Value>,
}

impl CacheStore {
    /// Creates or opens a cache store backed by the file at `path`.
    ///
    /// Missing parent directories are created, and a fresh backing file is
    /// initialized with an empty mapping. On Unix the directories and the
    /// file are restricted to the owning user, since cached values may carry
    /// semi-sensitive identifiers.
    ///
    /// # Errors
    /// * `CacheError::NotAFile` if `path` exists but is not a regular file
    /// * `CacheError::Io` if the file cannot be created or read
    /// * `CacheError::Format` if the existing content is not a serialized mapping
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let location = path.into();
        ensure_backing_file(&location)?;
        let raw = fs::read_to_string(&location)?;
        let entries = serde_json::from_str(&raw)?;
        Ok(Self { location, entries })
    }

    /// Returns the path to which the cache is persisted.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Returns the value for `key`, or `None` if the key is absent.
    ///
    /// Tolerates absence; combine with `Option::unwrap_or` for a fallback
    /// value. Never touches disk.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns whether the cache holds the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the value for `key`, failing if the key is absent.
    ///
    /// The strict counterpart of `get`: absence is an error, not a fallback.
    pub fn require(&self, key: &str) -> Result<&Value, CacheError> {
        self.entries
            .get(key)
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))
    }

    /// Inserts or overwrites `key` with `value` and persists the change.
    ///
    /// The whole mapping is serialized and the backing file replaced in full
    /// before this returns. The in-memory entry is updated first, so if the
    /// disk write fails the two diverge until the process exits and the
    /// update is lost.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<(), CacheError> {
        self.entries.insert(key.into(), value);
        self.save()
    }

    /// Returns the cached value for `key`, or computes, stores, and returns one.
    ///
    /// On a hit the supplier is never invoked. On a miss the supplier runs
    /// once: a `Some` result is persisted via `set` and returned, while a
    /// `None` result is returned without being stored, so the lookup will be
    /// retried on a future call instead of becoming a permanent miss. A
    /// supplier error propagates unchanged and nothing is written.
    pub fn get_or_compute<E, F>(&mut self, key: &str, supplier: F) -> Result<Option<Value>, E>
    where
        E: From<CacheError>,
        F: FnOnce(&str) -> Result<Option<Value>, E>,
    {
        if let Some(value) = self.entries.get(key) {
            return Ok(Some(value.clone()));
        }
        let value = supplier(key)?;
        if let Some(value) = &value {
            self.set(key, value.clone())?;
        }
        Ok(value)
    }

    /// Serializes the in-memory mapping over the backing file.
    fn save(&self) -> Result<(), CacheError> {
        let serialized = serde_json::to_string(&self.entries)?;
        fs::write(&self.location, serialized)?;
        Ok(())
    }
}

impl fmt::Display for CacheStore {
    /// Renders as the underlying mapping, for debugging and log output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(&self.entries).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("location", &self.location)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Ensures a regular file holding a serialized mapping exists at `path`.
fn ensure_backing_file(path: &Path) -> Result<(), CacheError> {
    if path.exists() {
        if !path.is_file() {
            return Err(CacheError::NotAFile(path.to_path_buf()));
        }
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        create_private_dirs(parent)?;
    }
    fs::write(path, "{}")?;
    restrict_to_owner(path)?;
    Ok(())
}

#[cfg(unix)]
fn create_private_dirs(parent: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(parent)
}

#[cfg(not(unix))]
fn create_private_dirs(parent: &Path) -> std::io::Result<()> {
    fs::create_dir_all(parent)
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
