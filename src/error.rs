//! Error types for Trueno-Registry
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Three classes of failure are kept apart:
//! - **Input errors**: duplicate id, unknown id
//! - **Precondition errors**: a lifecycle transition was refused
//! - **Storage errors**: the registry document could not be read or written
//!
//! None of them is retried internally.

use std::fmt;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Stable reason code for a refused registry or lifecycle operation.
///
/// The API layer maps these to transport-level status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    /// An artifact with the same id is already registered.
    DuplicateId,
    /// No artifact with the given id exists.
    NotFound,
    /// A newer artifact has been registered since the requested one.
    NotLatest,
    /// The artifact has not been approved.
    NotApproved,
    /// The artifact content no longer matches its integrity tag.
    IntegrityMismatch,
    /// Fewer than two artifacts are registered.
    NoHistory,
    /// No earlier approved and verifiable artifact exists.
    NoQualifyingPredecessor,
}

impl ReasonCode {
    /// Kebab-case wire form of the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateId => "duplicate-id",
            Self::NotFound => "not-found",
            Self::NotLatest => "not-latest",
            Self::NotApproved => "not-approved",
            Self::IntegrityMismatch => "integrity-mismatch",
            Self::NoHistory => "no-history",
            Self::NoQualifyingPredecessor => "no-qualifying-predecessor",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trueno-Registry error types
#[derive(Error, Debug)]
pub enum Error {
    /// Registration with an id that already exists
    #[error("Duplicate artifact id: {0}")]
    DuplicateId(String),

    /// Lookup of an unknown artifact id
    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// Deploy requested for an artifact that is no longer the newest
    #[error("Artifact {requested} is not the latest registered artifact (latest: {latest})")]
    NotLatest {
        /// Id the caller asked to deploy
        requested: String,
        /// Id of the newest registered artifact
        latest: String,
    },

    /// Deploy requested for an unapproved artifact
    #[error("Artifact not approved: {0}")]
    NotApproved(String),

    /// Artifact content changed (or vanished) since it was tagged
    #[error("Integrity mismatch for artifact {0}: content does not match its integrity tag")]
    IntegrityMismatch(String),

    /// Rollback with fewer than two registered artifacts
    #[error("No history to roll back to: {0} artifact(s) registered, at least 2 required")]
    NoHistory(usize),

    /// Rollback found no approved, verifiable predecessor
    #[error("No approved and verifiable artifact precedes the latest one")]
    NoQualifyingPredecessor,

    /// Registry document unreadable, unwritable or corrupt
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry document (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Reason code for input and precondition errors.
    ///
    /// Returns `None` for storage and configuration failures.
    #[must_use]
    pub const fn reason(&self) -> Option<ReasonCode> {
        match self {
            Self::DuplicateId(_) => Some(ReasonCode::DuplicateId),
            Self::NotFound(_) => Some(ReasonCode::NotFound),
            Self::NotLatest { .. } => Some(ReasonCode::NotLatest),
            Self::NotApproved(_) => Some(ReasonCode::NotApproved),
            Self::IntegrityMismatch(_) => Some(ReasonCode::IntegrityMismatch),
            Self::NoHistory(_) => Some(ReasonCode::NoHistory),
            Self::NoQualifyingPredecessor => Some(ReasonCode::NoQualifyingPredecessor),
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_) | Self::Config(_) => None,
        }
    }

    /// Whether this error comes from the persistence layer.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_)
        )
    }
}
