//! Content readers - where artifact bytes come from at verification time.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

/// Capability to stream the current bytes behind an artifact location.
///
/// Content is consumed incrementally, so verifying a multi-gigabyte model
/// never holds it in memory.
pub trait ContentReader: Send + Sync {
    /// Byte stream over one artifact.
    type Content: Read;

    /// Open the content at `location` for reading.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the content is missing or unreadable.
    fn open(&self, location: &str) -> io::Result<Self::Content>;

    /// Read the full content at `location` into memory.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the content is missing or unreadable.
    fn read_all(&self, location: &str) -> io::Result<Vec<u8>> {
        let mut content = Vec::new();
        self.open(location)?.read_to_end(&mut content)?;
        Ok(content)
    }
}

/// Reads artifact content from the local filesystem.
///
/// Relative locations resolve against an optional root directory.
#[derive(Debug, Clone, Default)]
pub struct FsContentReader {
    root: Option<PathBuf>,
}

impl FsContentReader {
    /// Reader resolving locations as given.
    #[must_use]
    pub const fn new() -> Self {
        Self { root: None }
    }

    /// Reader resolving relative locations under `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ContentReader for FsContentReader {
    type Content = File;

    fn open(&self, location: &str) -> io::Result<File> {
        File::open(self.resolve(location))
    }
}

/// In-memory content source keyed by location.
///
/// Thread-safe via `DashMap`; handy for tests and for embedding the
/// registry where artifacts live in another store.
#[derive(Debug, Default)]
pub struct MemoryContentReader {
    blobs: DashMap<String, Arc<[u8]>>,
}

impl MemoryContentReader {
    /// Create an empty reader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
        }
    }

    /// Store (or replace) the bytes at `location`.
    pub fn insert(&self, location: impl Into<String>, content: Vec<u8>) {
        self.blobs.insert(location.into(), content.into());
    }

    /// Drop the bytes at `location`.
    pub fn remove(&self, location: &str) {
        self.blobs.remove(location);
    }

    /// Number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether no blobs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl ContentReader for MemoryContentReader {
    type Content = Cursor<Arc<[u8]>>;

    fn open(&self, location: &str) -> io::Result<Self::Content> {
        self.blobs
            .get(location)
            .map(|v| Cursor::new(Arc::clone(v.value())))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no content at {location}"),
                )
            })
    }
}

impl<R: ContentReader + ?Sized> ContentReader for Arc<R> {
    type Content = R::Content;

    fn open(&self, location: &str) -> io::Result<Self::Content> {
        (**self).open(location)
    }
}
