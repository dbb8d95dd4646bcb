//! Artifact Record - one entry per trained model artifact

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::integrity::Tag;

/// Artifact Record represents a trained model artifact in the registry.
///
/// `location`, `integrity_tag` and `registered_at` are write-once. The
/// only mutation the registry ever applies is flipping `approved` from
/// `false` to `true`.
///
/// Records written before metrics, metadata, approval or timestamps were
/// tracked still load: missing maps are empty, `approved` is `false` and
/// `registered_at` is the Unix epoch.
///
/// ## Location Format
///
/// `location` is an opaque reference resolved by a
/// [`ContentReader`](crate::integrity::ContentReader), typically a file
/// path such as `models/model_run-001.bin`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactRecord {
    id: String,
    location: String,
    #[serde(default)]
    metrics: BTreeMap<String, f64>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    integrity_tag: Tag,
    #[serde(default)]
    approved: bool,
    #[serde(default)]
    registered_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Create a new unapproved record with no metrics or metadata.
    ///
    /// # Arguments
    ///
    /// * `id` - Unique artifact identifier (e.g. the training run id)
    /// * `location` - Reference to the artifact bytes
    /// * `integrity_tag` - Tag computed over the artifact content
    #[must_use]
    pub fn new(id: impl Into<String>, location: impl Into<String>, integrity_tag: Tag) -> Self {
        Self::builder(id, location, integrity_tag).build()
    }

    /// Create a builder for a record with metrics and metadata.
    #[must_use]
    pub fn builder(
        id: impl Into<String>,
        location: impl Into<String>,
        integrity_tag: Tag,
    ) -> ArtifactRecordBuilder {
        ArtifactRecordBuilder::new(id, location, integrity_tag)
    }

    /// Get the artifact ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the artifact location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Get the quality metrics reported by the trainer.
    #[must_use]
    pub const fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    /// Get a single metric by name.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Get the free-form metadata annotations.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Get the integrity tag computed at registration.
    #[must_use]
    pub const fn integrity_tag(&self) -> &Tag {
        &self.integrity_tag
    }

    /// Whether the artifact has been approved for deployment.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        self.approved
    }

    /// Get the registration timestamp.
    #[must_use]
    pub const fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub(crate) fn reset_approval(&mut self) {
        self.approved = false;
    }

    pub(crate) fn mark_approved(&mut self) {
        self.approved = true;
    }
}

/// Builder for `ArtifactRecord`.
#[derive(Debug)]
pub struct ArtifactRecordBuilder {
    id: String,
    location: String,
    integrity_tag: Tag,
    metrics: BTreeMap<String, f64>,
    metadata: BTreeMap<String, String>,
}

impl ArtifactRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(id: impl Into<String>, location: impl Into<String>, integrity_tag: Tag) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            integrity_tag,
            metrics: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add a metric.
    #[must_use]
    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Replace all metrics.
    #[must_use]
    pub fn metrics(mut self, metrics: BTreeMap<String, f64>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Add a metadata annotation.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace all metadata.
    #[must_use]
    pub fn metadata_map(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Build the `ArtifactRecord`, unapproved and stamped with the current time.
    #[must_use]
    pub fn build(self) -> ArtifactRecord {
        ArtifactRecord {
            id: self.id,
            location: self.location,
            metrics: self.metrics,
            metadata: self.metadata,
            integrity_tag: self.integrity_tag,
            approved: false,
            registered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::{digest, tag, Secret};

    fn test_tag() -> Tag {
        tag(&digest(b"weights"), &Secret::new(b"k").unwrap())
    }

    #[test]
    fn test_artifact_record_new() {
        let record = ArtifactRecord::new("run-1", "models/run-1.bin", test_tag());
        assert_eq!(record.id(), "run-1");
        assert_eq!(record.location(), "models/run-1.bin");
        assert!(!record.is_approved());
        assert!(record.metrics().is_empty());
        assert!(record.metadata().is_empty());
        assert_eq!(record.integrity_tag(), &test_tag());
    }

    #[test]
    fn test_artifact_record_builder() {
        let record = ArtifactRecord::builder("run-2", "models/run-2.bin", test_tag())
            .metric("accuracy", 0.93)
            .metric("f1", 0.88)
            .metadata("dataset", "credit-v3")
            .build();

        assert_eq!(record.metric("accuracy"), Some(0.93));
        assert_eq!(record.metric("missing"), None);
        assert_eq!(record.metadata().get("dataset").map(String::as_str), Some("credit-v3"));
    }

    #[test]
    fn test_artifact_record_legacy_fields_default() {
        let json = format!(
            r#"{{"id":"r","location":"l","integrity_tag":"{}","registered_at":"2024-01-01T00:00:00Z"}}"#,
            test_tag().to_hex()
        );
        let record: ArtifactRecord = serde_json::from_str(&json).unwrap();
        assert!(!record.is_approved());
        assert!(record.metrics().is_empty());
    }

    #[test]
    fn test_artifact_record_missing_timestamp_defaults_to_epoch() {
        let json = format!(
            r#"{{"id":"r","location":"l","integrity_tag":"{}"}}"#,
            test_tag().to_hex()
        );
        let record: ArtifactRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.registered_at(), DateTime::<Utc>::default());
        assert_eq!(record.registered_at().timestamp(), 0);
    }
}
