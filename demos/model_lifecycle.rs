//! Model Lifecycle Example
//!
//! Walks a model through register -> approve -> deploy, shows a tampered
//! artifact being refused, and rolls back to the previous release.
//!
//! Run with: cargo run --example model_lifecycle

use std::fs;

use anyhow::{Context, Result};
use trueno_registry::integrity::Secret;
use trueno_registry::{logging, ArtifactSubmission, RegistryConfig};

fn main() -> Result<()> {
    let workdir = std::env::temp_dir().join(format!("trueno-registry-demo-{}", std::process::id()));
    fs::create_dir_all(&workdir).context("failed creating demo directory")?;

    let config = RegistryConfig::new()
        .with_registry_path(workdir.join("registry.json"))
        .with_artifact_root(&workdir);
    logging::init(&config.log_filter)?;

    println!("=== Trueno-Registry Model Lifecycle ===\n");

    let controller = config.open_controller_with(Secret::new(b"local-demo-key")?)?;

    // -------------------------------------------------------------------------
    // 1. Train and release v1
    // -------------------------------------------------------------------------
    println!("1. Registering and deploying run-001...");
    let v1 = b"random-forest weights v1".to_vec();
    fs::write(workdir.join("model_run-001.bin"), &v1)?;
    controller.register(
        ArtifactSubmission::new("run-001", "model_run-001.bin")
            .metric("accuracy", 0.91)
            .metadata("dataset", "credit-default"),
        &v1,
    )?;
    controller.approve("run-001")?;
    controller.deploy("run-001")?;
    println!("   Deployed: {:?}", controller.deployed().map(|r| r.id().to_string()));

    // -------------------------------------------------------------------------
    // 2. Train v2, tamper with it, try to deploy
    // -------------------------------------------------------------------------
    println!("\n2. Registering run-002 and tampering with its file...");
    let v2 = b"random-forest weights v2".to_vec();
    fs::write(workdir.join("model_run-002.bin"), &v2)?;
    controller.register(
        ArtifactSubmission::new("run-002", "model_run-002.bin").metric("accuracy", 0.93),
        &v2,
    )?;
    controller.approve("run-002")?;
    fs::write(workdir.join("model_run-002.bin"), b"backdoored weights")?;

    match controller.deploy("run-002") {
        Ok(_) => println!("   Unexpected: tampered artifact deployed"),
        Err(e) => println!("   Refused ({}): {e}", e.reason().map_or("storage", |r| r.as_str())),
    }

    // -------------------------------------------------------------------------
    // 3. Restore v2 and deploy, then roll back
    // -------------------------------------------------------------------------
    println!("\n3. Restoring run-002, deploying, then rolling back...");
    fs::write(workdir.join("model_run-002.bin"), &v2)?;
    controller.deploy("run-002")?;
    println!("   Deployed: {:?}", controller.deployed().map(|r| r.id().to_string()));

    let restored = controller.rollback()?;
    println!("   Rolled back to: {}", restored.id());

    // -------------------------------------------------------------------------
    // 4. Summary
    // -------------------------------------------------------------------------
    println!("\n4. Registry summary:");
    println!("{}", serde_json::to_string_pretty(&controller.summary())?);

    fs::remove_dir_all(&workdir).ok();
    Ok(())
}
