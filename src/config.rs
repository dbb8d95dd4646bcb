//! Registry configuration
//!
//! Loaded from a TOML file or from the environment. The signing key is
//! never stored in the config itself, only the name of the environment
//! variable that provides it.
//!
//! ```toml
//! registry_path = "models/registry.json"
//! artifact_root = "models"
//! signing_key_env = "MODEL_SIGNING_KEY"
//! log_filter = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::integrity::{FsContentReader, IntegrityVerifier, Secret};
use crate::lifecycle::LifecycleController;
use crate::registry::{ArtifactRegistry, JsonFileStore};
use crate::{Error, Result};

/// Default location of the registry document.
pub const DEFAULT_REGISTRY_PATH: &str = "models/registry.json";

/// Default environment variable holding the signing key.
pub const DEFAULT_SIGNING_KEY_ENV: &str = "MODEL_SIGNING_KEY";

/// Environment override for `registry_path`.
pub const REGISTRY_PATH_ENV: &str = "MODEL_REGISTRY_PATH";

/// Environment override for `log_filter`.
pub const LOG_FILTER_ENV: &str = "MODEL_REGISTRY_LOG";

/// Controller backed by the local filesystem.
pub type FsLifecycleController = LifecycleController<JsonFileStore, FsContentReader>;

/// Main registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path of the registry JSON document
    pub registry_path: PathBuf,

    /// Directory that relative artifact locations resolve against
    pub artifact_root: Option<PathBuf>,

    /// Environment variable holding the signing key
    pub signing_key_env: String,

    /// Default tracing filter (`RUST_LOG` overrides)
    pub log_filter: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            artifact_root: None,
            signing_key_env: DEFAULT_SIGNING_KEY_ENV.to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl RegistryConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(format!("invalid registry config: {e}")))
    }

    /// Read and parse a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or
    /// [`Error::Config`] on malformed TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Defaults overridden by `MODEL_REGISTRY_PATH` and `MODEL_REGISTRY_LOG`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup(REGISTRY_PATH_ENV).filter(|v| !v.is_empty()) {
            config.registry_path = PathBuf::from(path);
        }
        if let Some(filter) = lookup(LOG_FILTER_ENV).filter(|v| !v.is_empty()) {
            config.log_filter = filter;
        }
        config
    }

    /// Set the registry document path
    #[must_use]
    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = path.into();
        self
    }

    /// Set the artifact root directory
    #[must_use]
    pub fn with_artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifact_root = Some(root.into());
        self
    }

    /// Set the signing key environment variable
    #[must_use]
    pub fn with_signing_key_env(mut self, name: impl Into<String>) -> Self {
        self.signing_key_env = name.into();
        self
    }

    /// Load the signing key from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the variable is unset or empty.
    pub fn signing_key(&self) -> Result<Secret> {
        self.signing_key_from(|name| std::env::var(name).ok())
    }

    fn signing_key_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<Secret> {
        let value = lookup(&self.signing_key_env).ok_or_else(|| {
            Error::Config(format!(
                "signing key variable {} is not set",
                self.signing_key_env
            ))
        })?;
        Secret::new(value.as_bytes())
    }

    /// Open the filesystem-backed controller this config describes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a missing key, or a storage error if
    /// the registry document cannot be opened.
    pub fn open_controller(&self) -> Result<FsLifecycleController> {
        self.open_controller_with(self.signing_key()?)
    }

    /// Open the filesystem-backed controller with an explicit key.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the registry document cannot be opened.
    pub fn open_controller_with(&self, secret: Secret) -> Result<FsLifecycleController> {
        let reader = match &self.artifact_root {
            Some(root) => FsContentReader::with_root(root),
            None => FsContentReader::new(),
        };
        let registry = ArtifactRegistry::open(JsonFileStore::open(&self.registry_path)?)?;
        tracing::info!(
            path = %self.registry_path.display(),
            records = registry.len(),
            "registry opened"
        );
        Ok(LifecycleController::new(
            registry,
            IntegrityVerifier::new(secret, reader),
        ))
    }
}
