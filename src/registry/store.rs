//! Registry stores - durable persistence for the registry document.
//!
//! Every save rewrites the whole document. The file store writes a sibling
//! temp file, syncs it, renames it over the live document, then syncs the
//! parent directory so the rename itself survives a crash. A crash
//! mid-write leaves either the old or the new document on disk.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::RegistryState;
use crate::{Error, Result};

/// Persistence backend for a [`RegistryState`].
///
/// A store is owned by exactly one registry instance.
pub trait RegistryStore: Send + Sync {
    /// Load the persisted state.
    ///
    /// Returns `None` when no document has ever been written.
    ///
    /// # Errors
    ///
    /// Returns a storage-class error if the document exists but cannot be
    /// read or parsed. An unreadable registry is never reported as empty.
    fn load(&self) -> Result<Option<RegistryState>>;

    /// Atomically replace the persisted state.
    ///
    /// # Errors
    ///
    /// Returns a storage-class error if the document cannot be written.
    fn save(&self, state: &RegistryState) -> Result<()>;
}

/// JSON document on the local filesystem.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the document at `path`, creating an empty one if absent.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the initial document cannot
    /// be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { path: path.into() };
        if let Some(parent) = store.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!(
                        "Failed to create registry directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        if !store.path.exists() {
            store.save(&RegistryState::new())?;
            tracing::info!(path = %store.path.display(), "initialized empty registry document");
        }
        Ok(store)
    }

    /// Path of the live document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<Option<RegistryState>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read registry document {}: {e}",
                    self.path.display()
                )))
            }
        };
        RegistryState::from_json(&raw).map(Some)
    }

    fn save(&self, state: &RegistryState) -> Result<()> {
        let payload = state.to_json()?;
        let tmp = self.temp_path();

        let write = || -> io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(payload.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::Storage(format!(
                "Failed to replace registry document {}: {e}",
                self.path.display()
            ))
        })?;

        // The rename has landed, so a failed directory sync is not a failed save.
        if let Err(e) = sync_parent_dir(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to sync registry directory");
        }
        Ok(())
    }
}

/// Flush the directory entry of `path` to disk.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// In-memory store holding the serialized document.
///
/// The document is kept as JSON so loads go through the same parsing and
/// validation as the file store. Data is lost on process restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create an empty store with no document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with a raw document.
    #[must_use]
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
        }
    }

    /// The raw persisted document, if any.
    #[must_use]
    pub fn document(&self) -> Option<String> {
        self.document.lock().clone()
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<Option<RegistryState>> {
        self.document
            .lock()
            .as_deref()
            .map(RegistryState::from_json)
            .transpose()
    }

    fn save(&self, state: &RegistryState) -> Result<()> {
        let payload = state.to_json()?;
        *self.document.lock() = Some(payload);
        Ok(())
    }
}
