//! Artifact Submission - what a trainer hands over for registration

use std::collections::BTreeMap;

use crate::integrity::Tag;
use crate::registry::ArtifactRecord;

/// A fitted model ready to be registered.
///
/// Carries everything on the future record except the integrity tag,
/// which the controller computes from the artifact content.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSubmission {
    id: String,
    location: String,
    metrics: BTreeMap<String, f64>,
    metadata: BTreeMap<String, String>,
}

impl ArtifactSubmission {
    /// Create a submission with no metrics or metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            metrics: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add a quality metric.
    #[must_use]
    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Add a metadata annotation.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
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

    pub(crate) fn into_record(self, integrity_tag: Tag) -> ArtifactRecord {
        ArtifactRecord::builder(self.id, self.location, integrity_tag)
            .metrics(self.metrics)
            .metadata_map(self.metadata)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::{digest, tag, Secret};

    #[test]
    fn test_into_record_carries_fields() {
        let t = tag(&digest(b"w"), &Secret::new(b"k").unwrap());
        let record = ArtifactSubmission::new("run-7", "models/run-7.bin")
            .metric("accuracy", 0.91)
            .metadata("framework", "sklearn")
            .into_record(t.clone());

        assert_eq!(record.id(), "run-7");
        assert_eq!(record.location(), "models/run-7.bin");
        assert_eq!(record.metric("accuracy"), Some(0.91));
        assert_eq!(record.metadata().get("framework").map(String::as_str), Some("sklearn"));
        assert_eq!(record.integrity_tag(), &t);
        assert!(!record.is_approved());
    }
}
