//! Lifecycle Tests: register -> approve -> deploy -> rollback
//!
//! Runs against the filesystem-backed controller so tampering is a real
//! edit of the artifact file on disk.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use trueno_registry::config::FsLifecycleController;
use trueno_registry::integrity::Secret;
use trueno_registry::{ArtifactStatus, ArtifactSubmission, Error, ReasonCode, RegistryConfig};

fn setup() -> (TempDir, FsLifecycleController) {
    let dir = tempfile::tempdir().expect("tempdir");
    let controller = open(dir.path());
    (dir, controller)
}

fn open(dir: &Path) -> FsLifecycleController {
    RegistryConfig::new()
        .with_registry_path(dir.join("registry.json"))
        .with_artifact_root(dir)
        .open_controller_with(Secret::new(b"local-demo-key").expect("secret"))
        .expect("open controller")
}

/// Write `model_<id>.bin` and register it.
fn train(dir: &Path, controller: &FsLifecycleController, id: &str) {
    let location = format!("model_{id}.bin");
    let content = format!("fitted-weights-{id}").into_bytes();
    fs::write(dir.join(&location), &content).expect("write artifact");
    controller
        .register(
            ArtifactSubmission::new(id, location)
                .metric("accuracy", 0.9)
                .metadata("trainer", "random-forest"),
            &content,
        )
        .expect("register");
}

fn tamper(dir: &Path, id: &str) {
    fs::write(dir.join(format!("model_{id}.bin")), b"backdoored-weights").expect("tamper");
}

fn ids(controller: &FsLifecycleController) -> Vec<String> {
    controller.list().iter().map(|r| r.id().to_string()).collect()
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_list_preserves_registration_order() {
    let (dir, controller) = setup();
    for id in ["run-3", "run-1", "run-2"] {
        train(dir.path(), &controller, id);
    }

    assert_eq!(ids(&controller), vec!["run-3", "run-1", "run-2"]);
    assert_eq!(controller.latest().unwrap().id(), "run-2");
}

#[test]
fn test_duplicate_registration_leaves_state_unchanged() {
    let (dir, controller) = setup();
    train(dir.path(), &controller, "r1");
    controller.approve("r1").unwrap();
    controller.deploy("r1").unwrap();
    let before = controller.get("r1").unwrap();

    let err = controller
        .register(ArtifactSubmission::new("r1", "other.bin"), b"other")
        .unwrap_err();

    assert_eq!(err.reason(), Some(ReasonCode::DuplicateId));
    assert_eq!(controller.get("r1").unwrap(), before);
    assert_eq!(controller.deployed().unwrap().id(), "r1");
    assert_eq!(controller.list().len(), 1);
}

#[test]
fn test_new_records_start_registered() {
    let (dir, controller) = setup();
    train(dir.path(), &controller, "r1");

    let record = controller.get("r1").unwrap();
    assert!(!record.is_approved());
    assert_eq!(record.metric("accuracy"), Some(0.9));
    assert_eq!(controller.status("r1").unwrap(), ArtifactStatus::Registered);
}

// =============================================================================
// Approval
// =============================================================================

#[test]
fn test_approve_is_idempotent() {
    let (dir, controller) = setup();
    train(dir.path(), &controller, "r1");

    controller.approve("r1").unwrap();
    assert!(controller.get("r1").unwrap().is_approved());

    controller.approve("r1").unwrap();
    assert!(controller.get("r1").unwrap().is_approved());
    assert_eq!(controller.status("r1").unwrap(), ArtifactStatus::Approved);
}

#[test]
fn test_approve_does_not_check_integrity() {
    let (dir, controller) = setup();
    train(dir.path(), &controller, "r1");
    tamper(dir.path(), "r1");

    controller.approve("r1").unwrap();
    assert!(controller.get("r1").unwrap().is_approved());
}

// =============================================================================
// Deployment
// =============================================================================

#[test]
fn test_deploy_not_latest_regardless_of_approval() {
    let (dir, controller) = setup();
    train(dir.path(), &controller, "old-unapproved");
    train(dir.path(), &controller, "old-approved");
    controller.approve("old-approved").unwrap();
    train(dir.path(), &controller, "newest");

    for id in ["old-unapproved", "old-approved"] {
        let err = controller.deploy(id).unwrap_err();
        assert_eq!(err.reason(), Some(ReasonCode::NotLatest), "{id}");
    }
    assert!(controller.deployed().is_none());
}

#[test]
fn test_deploy_detects_tampered_artifact() {
    let (dir, controller) = setup();
    train(dir.path(), &controller, "r1");
    controller.approve("r1").unwrap();
    tamper(dir.path(), "r1");

    let err = controller.deploy("r1").unwrap_err();
    assert!(matches!(err, Error::IntegrityMismatch(ref id) if id == "r1"));
    assert!(controller.deployed().is_none());
    assert!(!controller.verify_record("r1").unwrap());
}

#[test]
fn test_deploy_detects_deleted_artifact() {
    let (dir, controller) = setup();
    train(dir.path(), &controller, "r1");
    controller.approve("r1").unwrap();
    fs::remove_file(dir.path().join("model_r1.bin")).unwrap();

    let err = controller.deploy("r1").unwrap_err();
    assert_eq!(err.reason(), Some(ReasonCode::IntegrityMismatch));
}

#[test]
fn test_deploy_twice_is_idempotent() {
    let (dir, controller) = setup();
    train(dir.path(), &controller, "r1");
    controller.approve("r1").unwrap();

    controller.deploy("r1").unwrap();
    controller.deploy("r1").unwrap();
    assert_eq!(controller.deployed().unwrap().id(), "r1");

    train(dir.path(), &controller, "r2");
    let err = controller.deploy("r1").unwrap_err();
    assert_eq!(err.reason(), Some(ReasonCode::NotLatest));
    assert_eq!(controller.deployed().unwrap().id(), "r1");
}

// =============================================================================
// Rollback
// =============================================================================

#[test]
fn test_rollback_selects_most_recent_approved_predecessor() {
    let (dir, controller) = setup();
    for id in ["A", "B", "C"] {
        train(dir.path(), &controller, id);
    }
    controller.approve("A").unwrap();
    controller.approve("B").unwrap();

    let target = controller.rollback().unwrap();
    assert_eq!(target.id(), "B");
    assert_eq!(controller.deployed().unwrap().id(), "B");
}

#[test]
fn test_rollback_excludes_latest_even_when_approved() {
    let (dir, controller) = setup();
    for id in ["A", "B"] {
        train(dir.path(), &controller, id);
        controller.approve(id).unwrap();
    }
    controller.deploy("B").unwrap();

    assert_eq!(controller.rollback().unwrap().id(), "A");
}

#[test]
fn test_rollback_with_single_record_is_no_history() {
    let (dir, controller) = setup();
    assert!(matches!(controller.rollback(), Err(Error::NoHistory(0))));

    train(dir.path(), &controller, "r1");
    controller.approve("r1").unwrap();
    controller.deploy("r1").unwrap();

    let err = controller.rollback().unwrap_err();
    assert_eq!(err.reason(), Some(ReasonCode::NoHistory));
    assert_eq!(controller.deployed().unwrap().id(), "r1");
}

#[test]
fn test_rollback_without_approved_predecessor() {
    let (dir, controller) = setup();
    for id in ["A", "B", "C"] {
        train(dir.path(), &controller, id);
    }
    controller.approve("C").unwrap();
    controller.deploy("C").unwrap();

    let err = controller.rollback().unwrap_err();
    assert_eq!(err.reason(), Some(ReasonCode::NoQualifyingPredecessor));
    assert_eq!(controller.deployed().unwrap().id(), "C");
}

#[test]
fn test_rollback_skips_tampered_predecessor() {
    let (dir, controller) = setup();
    for id in ["A", "B", "C"] {
        train(dir.path(), &controller, id);
        controller.approve(id).unwrap();
    }
    tamper(dir.path(), "B");

    assert_eq!(controller.rollback().unwrap().id(), "A");

    tamper(dir.path(), "A");
    let err = controller.rollback().unwrap_err();
    assert_eq!(err.reason(), Some(ReasonCode::NoQualifyingPredecessor));
    assert_eq!(controller.deployed().unwrap().id(), "A");
}

// =============================================================================
// End-to-end
// =============================================================================

#[test]
fn test_end_to_end_promotion_and_rollback() {
    let (dir, controller) = setup();

    train(dir.path(), &controller, "r1");
    assert!(!controller.get("r1").unwrap().is_approved());
    controller.approve("r1").unwrap();
    controller.deploy("r1").unwrap();
    assert_eq!(controller.deployed().unwrap().id(), "r1");

    train(dir.path(), &controller, "r2");
    assert_eq!(
        controller.deploy("r1").unwrap_err().reason(),
        Some(ReasonCode::NotLatest)
    );

    controller.approve("r2").unwrap();
    controller.deploy("r2").unwrap();
    assert_eq!(controller.deployed().unwrap().id(), "r2");
    assert_eq!(controller.status("r1").unwrap(), ArtifactStatus::Approved);

    controller.rollback().unwrap();
    assert_eq!(controller.deployed().unwrap().id(), "r1");
    assert_eq!(controller.status("r2").unwrap(), ArtifactStatus::Approved);
}

#[test]
fn test_state_survives_reopen() {
    let (dir, controller) = setup();
    for id in ["r1", "r2"] {
        train(dir.path(), &controller, id);
        controller.approve(id).unwrap();
    }
    controller.deploy("r2").unwrap();
    drop(controller);

    let reopened = open(dir.path());
    assert_eq!(ids(&reopened), vec!["r1", "r2"]);
    assert_eq!(reopened.deployed().unwrap().id(), "r2");
    assert!(reopened.verify_record("r1").unwrap());

    let summary = reopened.summary();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.approved_ids, vec!["r1", "r2"]);
}

#[test]
fn test_corrupt_document_is_not_empty_registry() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("registry.json"), "{\"records\": 7}").unwrap();

    let err = RegistryConfig::new()
        .with_registry_path(dir.path().join("registry.json"))
        .open_controller_with(Secret::new(b"k").unwrap())
        .unwrap_err();
    assert!(err.is_storage());
    assert!(err.reason().is_none());
}

#[test]
fn test_open_controller_requires_signing_key() {
    let dir = tempfile::tempdir().unwrap();
    let err = RegistryConfig::new()
        .with_registry_path(dir.path().join("registry.json"))
        .with_signing_key_env("TRUENO_REGISTRY_TEST_KEY_THAT_IS_NEVER_SET")
        .open_controller()
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
