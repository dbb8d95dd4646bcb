//! Artifact Registry - durable record store with a single deployed pointer
//!
//! ## Schema Overview
//!
//! ```text
//! RegistryState
//!   ├── records: [ArtifactRecord] (append-only, registration order)
//!   └── deployed_id: Option<id>  ──> approved record
//! ```
//!
//! ## Concurrency
//!
//! One `RwLock` guards the in-memory state. Every mutation runs as a
//! single step under the write lock: copy the state, apply the change,
//! persist the copy, then swap it in. A failed save leaves both memory and
//! disk untouched, and readers only ever see committed state.
//!
//! ## Usage
//!
//! ```rust
//! use trueno_registry::integrity::{digest, tag, Secret};
//! use trueno_registry::registry::{ArtifactRecord, ArtifactRegistry, MemoryStore};
//!
//! let secret = Secret::new(b"local-demo-key")?;
//! let registry = ArtifactRegistry::open(MemoryStore::new())?;
//!
//! let t = tag(&digest(b"weights"), &secret);
//! registry.register(ArtifactRecord::new("run-001", "models/run-001.bin", t))?;
//!
//! assert!(registry.approve("run-001")?);
//! assert!(registry.set_deployed("run-001")?);
//! assert_eq!(registry.deployed().map(|r| r.id().to_string()), Some("run-001".into()));
//! # Ok::<(), trueno_registry::Error>(())
//! ```

mod artifact_record;
mod state;
mod store;

pub use artifact_record::{ArtifactRecord, ArtifactRecordBuilder};
pub use state::{ArtifactStatus, RegistryState};
pub use store::{JsonFileStore, MemoryStore, RegistryStore};

use parking_lot::{RwLock, RwLockWriteGuard};
use serde::Serialize;

use crate::logging::audit;
use crate::{Error, Result};

/// Dashboard view of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    /// Number of registered artifacts.
    pub total: usize,
    /// Ids of approved artifacts, in registration order.
    pub approved_ids: Vec<String>,
    /// Id of the newest artifact.
    pub latest_id: Option<String>,
    /// Id of the deployed artifact.
    pub deployed_id: Option<String>,
}

/// Thread-safe artifact registry backed by a [`RegistryStore`].
#[derive(Debug)]
pub struct ArtifactRegistry<S> {
    state: RwLock<RegistryState>,
    store: S,
}

impl<S: RegistryStore> ArtifactRegistry<S> {
    /// Open a registry over `store`, loading any persisted state.
    ///
    /// # Errors
    ///
    /// Returns a storage-class error if the persisted document is
    /// unreadable or corrupt.
    pub fn open(store: S) -> Result<Self> {
        let state = store.load()?.unwrap_or_default();
        tracing::debug!(
            records = state.len(),
            deployed = ?state.deployed_id(),
            "registry loaded"
        );
        Ok(Self {
            state: RwLock::new(state),
            store,
        })
    }

    /// Register a new artifact.
    ///
    /// The record is stored unapproved regardless of its incoming flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if the id exists, or a storage
    /// error if the document cannot be written.
    pub fn register(&self, record: ArtifactRecord) -> Result<()> {
        let id = record.id().to_string();
        let mut guard = self.state.write();
        let mut next = guard.clone();
        next.push(record)?;
        self.commit(&mut guard, next)?;
        audit("registry", "registered", &id);
        Ok(())
    }

    /// Get a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn get(&self, id: &str) -> Result<ArtifactRecord> {
        self.state
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// All records in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ArtifactRecord> {
        self.state.read().records().to_vec()
    }

    /// The most recently registered record.
    #[must_use]
    pub fn latest(&self) -> Option<ArtifactRecord> {
        self.state.read().latest().cloned()
    }

    /// Approve a record. Approving twice is a successful no-op.
    ///
    /// Returns `false` if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be written.
    pub fn approve(&self, id: &str) -> Result<bool> {
        let mut guard = self.state.write();
        match guard.get(id) {
            None => return Ok(false),
            Some(record) if record.is_approved() => return Ok(true),
            Some(_) => {}
        }
        let mut next = guard.clone();
        next.approve(id);
        self.commit(&mut guard, next)?;
        audit("registry", "approved", id);
        Ok(true)
    }

    /// Point the deployed pointer at `id` if it exists and is approved.
    ///
    /// The check and the write happen under one write lock. Returns
    /// `false` and leaves the state untouched when the check fails.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be written.
    pub fn set_deployed(&self, id: &str) -> Result<bool> {
        let mut guard = self.state.write();
        let mut next = guard.clone();
        if !next.set_deployed(id) {
            tracing::warn!(id, "refused to deploy unknown or unapproved artifact");
            return Ok(false);
        }
        if guard.deployed_id() != Some(id) {
            self.commit(&mut guard, next)?;
        }
        audit("registry", "deployed", id);
        Ok(true)
    }

    /// The deployed record, if any.
    #[must_use]
    pub fn deployed(&self) -> Option<ArtifactRecord> {
        self.state.read().deployed().cloned()
    }

    /// Lifecycle status of a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn status(&self, id: &str) -> Result<ArtifactStatus> {
        self.state
            .read()
            .status(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Counts and ids for dashboards.
    #[must_use]
    pub fn summary(&self) -> RegistrySummary {
        let state = self.state.read();
        RegistrySummary {
            total: state.len(),
            approved_ids: state
                .records()
                .iter()
                .filter(|r| r.is_approved())
                .map(|r| r.id().to_string())
                .collect(),
            latest_id: state.latest().map(|r| r.id().to_string()),
            deployed_id: state.deployed_id().map(str::to_string),
        }
    }

    /// Number of registered artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    /// Whether no artifacts are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    fn commit(
        &self,
        guard: &mut RwLockWriteGuard<'_, RegistryState>,
        next: RegistryState,
    ) -> Result<()> {
        self.store.save(&next).map_err(|e| {
            tracing::error!(error = %e, "failed to persist registry document");
            e
        })?;
        **guard = next;
        Ok(())
    }
}
