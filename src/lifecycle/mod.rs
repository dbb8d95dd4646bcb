//! Lifecycle Controller - gated promotion and rollback
//!
//! ## State Machine
//!
//! ```text
//!   register          approve           deploy (latest only, verified)
//! ──────────> Registered ──────> Approved ──────────────────────────> Deployed
//!                                   ^                                    │
//!                                   └──── superseded by a newer deploy ──┘
//!
//! rollback: newest approved + verifiable record, excluding the latest one
//! ```
//!
//! Every refused transition is reported with a [`ReasonCode`] and leaves
//! the registry unchanged.
//!
//! ## Concurrency
//!
//! Composite transitions (check latest, check approval, re-verify content,
//! move the pointer) run under one controller-wide lock, so no register or
//! deploy can slip between a decision and its write. Reads go straight to
//! the registry and never wait on content verification.
//!
//! [`ReasonCode`]: crate::ReasonCode

mod submission;

pub use submission::ArtifactSubmission;

use parking_lot::Mutex;

use crate::integrity::{ContentReader, IntegrityVerifier, Tag};
use crate::logging::audit;
use crate::registry::{
    ArtifactRecord, ArtifactRegistry, ArtifactStatus, RegistryStore, RegistrySummary,
};
use crate::{Error, Result};

/// Minimum number of registered artifacts for a rollback.
pub const MIN_ROLLBACK_HISTORY: usize = 2;

/// Orchestrates register, approve, deploy and rollback.
///
/// Owns the registry; external code only reaches it through these
/// operations.
#[derive(Debug)]
pub struct LifecycleController<S, R> {
    registry: ArtifactRegistry<S>,
    verifier: IntegrityVerifier<R>,
    transitions: Mutex<()>,
}

impl<S: RegistryStore, R: ContentReader> LifecycleController<S, R> {
    /// Create a controller over an opened registry.
    #[must_use]
    pub fn new(registry: ArtifactRegistry<S>, verifier: IntegrityVerifier<R>) -> Self {
        Self {
            registry,
            verifier,
            transitions: Mutex::new(()),
        }
    }

    /// Register a trained artifact, tagging the supplied bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if the id is taken, or a storage
    /// error if the registry cannot be persisted.
    pub fn register(
        &self,
        submission: ArtifactSubmission,
        content: &[u8],
    ) -> Result<ArtifactRecord> {
        self.insert(submission, self.verifier.tag_content(content))
    }

    /// Register a trained artifact, streaming its bytes from its location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the content cannot be read, plus the
    /// errors of [`register`](Self::register).
    pub fn register_from_location(&self, submission: ArtifactSubmission) -> Result<ArtifactRecord> {
        let tag = self.verifier.tag_location(submission.location())?;
        self.insert(submission, tag)
    }

    fn insert(&self, submission: ArtifactSubmission, tag: Tag) -> Result<ArtifactRecord> {
        let record = submission.into_record(tag);
        let _guard = self.transitions.lock();
        self.registry.register(record.clone())?;
        tracing::info!(
            id = record.id(),
            location = record.location(),
            "artifact registered"
        );
        Ok(record)
    }

    /// Approve an artifact for deployment.
    ///
    /// Idempotent. No integrity check happens here; content is checked at
    /// deploy time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn approve(&self, id: &str) -> Result<()> {
        let _guard = self.transitions.lock();
        if self.registry.approve(id)? {
            Ok(())
        } else {
            tracing::warn!(id, "approval requested for unknown artifact");
            Err(Error::NotFound(id.to_string()))
        }
    }

    /// Deploy the newest artifact.
    ///
    /// Preconditions, checked in order: the id exists, it is the latest
    /// registered artifact, it is approved, and its current content still
    /// matches its integrity tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::NotLatest`],
    /// [`Error::NotApproved`] or [`Error::IntegrityMismatch`] with no state
    /// change, or a storage error.
    pub fn deploy(&self, id: &str) -> Result<ArtifactRecord> {
        let _guard = self.transitions.lock();
        let record = self.registry.get(id)?;

        if let Some(latest) = self.registry.latest() {
            if latest.id() != id {
                tracing::warn!(id, latest = latest.id(), "deploy refused: not latest");
                return Err(Error::NotLatest {
                    requested: id.to_string(),
                    latest: latest.id().to_string(),
                });
            }
        }

        if !record.is_approved() {
            tracing::warn!(id, "deploy refused: not approved");
            return Err(Error::NotApproved(id.to_string()));
        }

        if !self.verifies(&record) {
            tracing::warn!(id, location = record.location(), "deploy refused: integrity mismatch");
            return Err(Error::IntegrityMismatch(id.to_string()));
        }

        if !self.registry.set_deployed(id)? {
            return Err(Error::NotApproved(id.to_string()));
        }
        audit("deploy", "initiated", id);
        Ok(record)
    }

    /// Reinstate the most recent approved, verifiable artifact that
    /// precedes the latest one.
    ///
    /// This is a search over history, not a pointer decrement: the
    /// currently deployed artifact plays no part in the choice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoHistory`] with fewer than two artifacts,
    /// [`Error::NoQualifyingPredecessor`] if no candidate qualifies, or
    /// [`Error::NotApproved`] if the chosen target could not be deployed.
    pub fn rollback(&self) -> Result<ArtifactRecord> {
        let _guard = self.transitions.lock();
        let records = self.registry.list();

        if records.len() < MIN_ROLLBACK_HISTORY {
            tracing::warn!(records = records.len(), "rollback refused: no previous artifact");
            return Err(Error::NoHistory(records.len()));
        }

        let target = records[..records.len() - 1]
            .iter()
            .rev()
            .find(|r| r.is_approved() && self.verifies(r))
            .cloned();

        let Some(target) = target else {
            tracing::warn!("rollback refused: no approved and verifiable predecessor");
            return Err(Error::NoQualifyingPredecessor);
        };

        if !self.registry.set_deployed(target.id())? {
            tracing::error!(id = target.id(), "failed to mark rollback target as deployed");
            return Err(Error::NotApproved(target.id().to_string()));
        }
        audit("rollback", "initiated", target.id());
        Ok(target)
    }

    /// Whether an artifact's current content matches its integrity tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn verify_record(&self, id: &str) -> Result<bool> {
        let record = self.registry.get(id)?;
        Ok(self.verifies(&record))
    }

    /// Whether the latest artifact verifies. `false` for an empty registry.
    #[must_use]
    pub fn verify_latest(&self) -> bool {
        self.registry
            .latest()
            .is_some_and(|record| self.verifies(&record))
    }

    /// Get a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn get(&self, id: &str) -> Result<ArtifactRecord> {
        self.registry.get(id)
    }

    /// All records in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ArtifactRecord> {
        self.registry.list()
    }

    /// The most recently registered record.
    #[must_use]
    pub fn latest(&self) -> Option<ArtifactRecord> {
        self.registry.latest()
    }

    /// The deployed record.
    #[must_use]
    pub fn deployed(&self) -> Option<ArtifactRecord> {
        self.registry.deployed()
    }

    /// Lifecycle status of a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn status(&self, id: &str) -> Result<ArtifactStatus> {
        self.registry.status(id)
    }

    /// Counts and ids for dashboards.
    #[must_use]
    pub fn summary(&self) -> RegistrySummary {
        self.registry.summary()
    }

    fn verifies(&self, record: &ArtifactRecord) -> bool {
        self.verifier
            .verify_location(record.location(), record.integrity_tag())
    }
}
