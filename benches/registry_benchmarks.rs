//! Registry benchmarks
//!
//! - Integrity tagging and verification across artifact sizes
//! - Registration throughput (every call rewrites the document)
//!
//! Toyota Way: Measure before optimizing (Genchi Genbutsu)

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use trueno_registry::integrity::{digest, tag, verify, IntegrityVerifier, MemoryContentReader, Secret};
use trueno_registry::registry::{ArtifactRegistry, MemoryStore};
use trueno_registry::{ArtifactSubmission, LifecycleController};

/// Benchmark tag + verify over artifact blobs
fn bench_integrity(c: &mut Criterion) {
    let secret = Secret::new(b"bench-key").unwrap();
    let mut group = c.benchmark_group("integrity");

    for size in [1_024usize, 1_024 * 1_024, 16 * 1_024 * 1_024] {
        let blob = vec![0xA5u8; size];
        let t = tag(&digest(&blob), &secret);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("tag", size), &blob, |b, blob| {
            b.iter(|| black_box(tag(&digest(blob), &secret)));
        });
        group.bench_with_input(BenchmarkId::new("verify", size), &blob, |b, blob| {
            b.iter(|| black_box(verify(blob, &t, &secret)));
        });
    }

    group.finish();
}

/// Benchmark registering N artifacts into an in-memory store
fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("register");

    for count in [10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let reader = Arc::new(MemoryContentReader::new());
                let controller = LifecycleController::new(
                    ArtifactRegistry::open(MemoryStore::new()).unwrap(),
                    IntegrityVerifier::new(Secret::new(b"bench-key").unwrap(), reader),
                );
                for i in 0..count {
                    let id = format!("run-{i}");
                    controller
                        .register(ArtifactSubmission::new(&id, format!("models/{id}.bin")), id.as_bytes())
                        .unwrap();
                }
                black_box(controller.latest());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_integrity, bench_register);
criterion_main!(benches);
