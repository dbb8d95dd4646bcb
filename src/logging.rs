//! Logging setup and audit events
//!
//! All state changes are emitted as `tracing` events under the `audit`
//! target, so a subscriber can route them to a separate sink with a
//! filter such as `RUST_LOG=info,audit=info`.

use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Target used for audit events.
pub const AUDIT_TARGET: &str = "audit";

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the filter is invalid or a global
/// subscriber is already installed.
pub fn init(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| Error::Config(format!("invalid log filter {default_filter:?}: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install tracing subscriber: {e}")))
}

/// Emit a structured audit event.
pub(crate) fn audit(category: &str, action: &str, id: &str) {
    tracing::info!(target: AUDIT_TARGET, category, action, id, "audit event");
}
