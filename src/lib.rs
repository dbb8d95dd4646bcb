//! # Trueno-Registry: Tamper-Evident Model Artifact Registry
//!
//! **Version**: 0.1.0
//!
//! Trueno-Registry tracks model artifacts produced by training runs, gates
//! their promotion through review, re-verifies their content before any
//! deployment, and rolls back to the last known-good artifact.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: Deployment stops on any integrity mismatch
//! - **Poka-Yoke**: Only the newest approved artifact can be promoted directly
//! - **Kanban**: Registered -> Approved -> Deployed, pulled one stage at a time
//! - **Genchi Genbutsu**: Integrity is checked against the bytes on disk *now*
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use trueno_registry::integrity::{IntegrityVerifier, MemoryContentReader, Secret};
//! use trueno_registry::lifecycle::{ArtifactSubmission, LifecycleController};
//! use trueno_registry::registry::{ArtifactRegistry, MemoryStore};
//!
//! let reader = Arc::new(MemoryContentReader::new());
//! reader.insert("models/run-001.bin", b"weights".to_vec());
//!
//! let controller = LifecycleController::new(
//!     ArtifactRegistry::open(MemoryStore::new())?,
//!     IntegrityVerifier::new(Secret::new(b"local-demo-key")?, Arc::clone(&reader)),
//! );
//!
//! controller.register(
//!     ArtifactSubmission::new("run-001", "models/run-001.bin").metric("accuracy", 0.94),
//!     b"weights",
//! )?;
//! controller.approve("run-001")?;
//! controller.deploy("run-001")?;
//!
//! assert_eq!(controller.deployed().unwrap().id(), "run-001");
//! # Ok::<(), trueno_registry::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod integrity;
pub mod lifecycle;
pub mod logging;
pub mod registry;

pub use config::RegistryConfig;
pub use error::{Error, ReasonCode, Result};
pub use lifecycle::{ArtifactSubmission, LifecycleController};
pub use registry::{ArtifactRecord, ArtifactRegistry, ArtifactStatus};
