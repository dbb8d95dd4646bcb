//! Registry State - the full persisted registry document

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::ArtifactRecord;
use crate::{Error, Result};

/// Lifecycle status of a single artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactStatus {
    /// Registered, awaiting review.
    Registered,
    /// Approved for deployment but not live.
    Approved,
    /// The currently deployed artifact.
    Deployed,
}

/// Registry State holds every artifact record plus the deployed pointer.
///
/// ## Invariants
///
/// - `records` is append-only, in registration order
/// - ids are unique
/// - `deployed_id`, when set, names an existing approved record
///
/// Mutators are crate-private; outside the crate the state is read-only.
/// The id index is never serialized. Every deserialization path, including
/// a plain `serde_json::from_str::<RegistryState>`, rebuilds it and checks
/// the invariants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RawRegistryState")]
pub struct RegistryState {
    records: Vec<ArtifactRecord>,
    deployed_id: Option<String>,
    #[serde(skip)]
    index: FxHashMap<String, usize>,
}

/// Registry document as written on disk, before validation.
#[derive(Deserialize)]
struct RawRegistryState {
    #[serde(default)]
    records: Vec<ArtifactRecord>,
    #[serde(default)]
    deployed_id: Option<String>,
}

impl TryFrom<RawRegistryState> for RegistryState {
    type Error = Error;

    fn try_from(raw: RawRegistryState) -> Result<Self> {
        let mut state = Self {
            records: raw.records,
            deployed_id: raw.deployed_id,
            index: FxHashMap::default(),
        };
        state.rebuild_index()?;
        state.validate()?;
        Ok(state)
    }
}

impl RegistryState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a registry document and check its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] for malformed JSON and
    /// [`Error::Storage`] for a document that violates the invariants.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawRegistryState = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Serialize to a pretty-printed registry document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// All records in registration order.
    #[must_use]
    pub fn records(&self) -> &[ArtifactRecord] {
        &self.records
    }

    /// Id of the deployed record, if any.
    #[must_use]
    pub fn deployed_id(&self) -> Option<&str> {
        self.deployed_id.as_deref()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ArtifactRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    /// The most recently registered record.
    #[must_use]
    pub fn latest(&self) -> Option<&ArtifactRecord> {
        self.records.last()
    }

    /// The deployed record.
    #[must_use]
    pub fn deployed(&self) -> Option<&ArtifactRecord> {
        self.deployed_id.as_deref().and_then(|id| self.get(id))
    }

    /// Lifecycle status of a record.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<ArtifactStatus> {
        let record = self.get(id)?;
        Some(if self.deployed_id() == Some(id) {
            ArtifactStatus::Deployed
        } else if record.is_approved() {
            ArtifactStatus::Approved
        } else {
            ArtifactStatus::Registered
        })
    }

    pub(crate) fn push(&mut self, mut record: ArtifactRecord) -> Result<()> {
        if self.index.contains_key(record.id()) {
            return Err(Error::DuplicateId(record.id().to_string()));
        }
        record.reset_approval();
        self.index.insert(record.id().to_string(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub(crate) fn approve(&mut self, id: &str) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.records[i].mark_approved();
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_deployed(&mut self, id: &str) -> bool {
        let approved = self.get(id).is_some_and(ArtifactRecord::is_approved);
        if approved {
            self.deployed_id = Some(id.to_string());
        }
        approved
    }

    fn rebuild_index(&mut self) -> Result<()> {
        self.index.clear();
        self.index.reserve(self.records.len());
        for (i, record) in self.records.iter().enumerate() {
            if self.index.insert(record.id().to_string(), i).is_some() {
                return Err(Error::Storage(format!(
                    "corrupt registry document: duplicate artifact id {}",
                    record.id()
                )));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(id) = self.deployed_id.as_deref() {
            match self.get(id) {
                None => {
                    return Err(Error::Storage(format!(
                        "corrupt registry document: deployed artifact {id} does not exist"
                    )))
                }
                Some(record) if !record.is_approved() => {
                    return Err(Error::Storage(format!(
                        "corrupt registry document: deployed artifact {id} is not approved"
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::{digest, tag, Secret};

    fn record(id: &str) -> ArtifactRecord {
        let t = tag(&digest(id.as_bytes()), &Secret::new(b"k").unwrap());
        ArtifactRecord::new(id, format!("models/{id}.bin"), t)
    }

    #[test]
    fn test_state_default() {
        let state = RegistryState::new();
        assert!(state.is_empty());
        assert!(state.latest().is_none());
        assert!(state.deployed().is_none());
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let mut state = RegistryState::new();
        state.push(record("a")).unwrap();
        let err = state.push(record("a")).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(id) if id == "a"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_set_deployed_requires_approval() {
        let mut state = RegistryState::new();
        state.push(record("a")).unwrap();

        assert!(!state.set_deployed("a"));
        assert!(!state.set_deployed("ghost"));
        assert!(state.deployed_id().is_none());

        assert!(state.approve("a"));
        assert!(state.set_deployed("a"));
        assert_eq!(state.status("a"), Some(ArtifactStatus::Deployed));
    }

    #[test]
    fn test_status_transitions() {
        let mut state = RegistryState::new();
        state.push(record("a")).unwrap();
        assert_eq!(state.status("a"), Some(ArtifactStatus::Registered));
        state.approve("a");
        assert_eq!(state.status("a"), Some(ArtifactStatus::Approved));
        assert_eq!(state.status("missing"), None);
    }

    #[test]
    fn test_from_json_normalizes_missing_fields() {
        let state = RegistryState::from_json("{}").unwrap();
        assert!(state.is_empty());
        assert!(state.deployed_id().is_none());
    }

    #[test]
    fn test_from_json_rejects_dangling_pointer() {
        let err = RegistryState::from_json(r#"{"records":[],"deployed_id":"ghost"}"#).unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_from_json_rejects_unapproved_pointer() {
        let mut state = RegistryState::new();
        state.push(record("a")).unwrap();
        state.deployed_id = Some("a".to_string());
        let json = state.to_json().unwrap();

        let err = RegistryState::from_json(&json).unwrap_err();
        assert!(matches!(err, Error::Storage(msg) if msg.contains("not approved")));
    }

    #[test]
    fn test_serde_deserialize_rebuilds_index() {
        let mut state = RegistryState::new();
        state.push(record("a")).unwrap();
        state.approve("a");
        state.set_deployed("a");
        let json = serde_json::to_string(&state).unwrap();

        let mut loaded: RegistryState = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.get("a").map(ArtifactRecord::id), Some("a"));
        assert_eq!(loaded.deployed().map(ArtifactRecord::id), Some("a"));

        let err = loaded.push(record("a")).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_serde_deserialize_checks_invariants() {
        let dangling = r#"{"records":[],"deployed_id":"ghost"}"#;
        assert!(serde_json::from_str::<RegistryState>(dangling).is_err());

        let mut state = RegistryState::new();
        state.push(record("a")).unwrap();
        let doc = serde_json::to_value(&state).unwrap();
        let records = doc["records"].clone();
        let duplicated = serde_json::json!({ "records": [records[0], records[0]] });
        assert!(serde_json::from_value::<RegistryState>(duplicated).is_err());
    }

    #[test]
    fn test_json_preserves_order_and_pointer() {
        let mut state = RegistryState::new();
        for id in ["a", "b", "c"] {
            state.push(record(id)).unwrap();
        }
        state.approve("b");
        state.set_deployed("b");

        let loaded = RegistryState::from_json(&state.to_json().unwrap()).unwrap();
        let ids: Vec<_> = loaded.records().iter().map(ArtifactRecord::id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(loaded.deployed().map(ArtifactRecord::id), Some("b"));
        assert_eq!(loaded.get("c").map(ArtifactRecord::id), Some("c"));
    }
}
