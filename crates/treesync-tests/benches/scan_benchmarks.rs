//! Benchmarks for fingerprinting and incremental sync
//!
//! Measures a scan-only pass, a cold sync into an empty destination and a warm
//! sync where every folder marker already matches.

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use std::time::Duration;
use tempfile::TempDir;
use treesync_core::{
    CancellationToken, FingerprintBuilder, FingerprintQueue, FolderScanner, ScanProgress,
    SyncService,
};
use treesync_tests::test_utils::{generate_tree, TreeFixture};
use treesync_types::RunId;

/// (label, depth, breadth, files per folder)
const TREE_SHAPES: &[(&str, usize, usize, usize)] = &[
    ("wide", 1, 32, 8),
    ("deep", 6, 2, 4),
    ("bushy", 3, 6, 6),
];

fn bench_fingerprint_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint_builder");
    for count in [16usize, 256, 4096] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut builder = FingerprintBuilder::new();
                for index in 0..count {
                    builder
                        .append_str(black_box("file_name.dat"))
                        .append_i64(black_box(index as i64 * 4096))
                        .append_i64(black_box(1_700_000_000_000));
                }
                black_box(builder.finish())
            });
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    group.measurement_time(Duration::from_secs(5));

    for &(label, depth, breadth, files) in TREE_SHAPES {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(label);
        generate_tree(&root, depth, breadth, files, 256);

        group.bench_function(label, |b| {
            b.iter(|| {
                let progress = ScanProgress::new(RunId::new_v4(), FingerprintQueue::new());
                let hash = FolderScanner::new(progress.clone(), CancellationToken::new())
                    .scan(&root);
                black_box((hash, progress.snapshot()))
            });
        });
    }
    group.finish();
}

fn bench_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    for &(label, depth, breadth, files) in TREE_SHAPES {
        group.bench_function(BenchmarkId::new("cold", label), |b| {
            b.iter_batched(
                || {
                    let fixture = TreeFixture::new(label);
                    generate_tree(&fixture.source, depth, breadth, files, 4 * 1024);
                    fixture
                },
                |fixture| {
                    let report = SyncService::default()
                        .sync(&fixture.source, &fixture.destination)
                        .unwrap();
                    black_box(report.transfer.file_count)
                },
                BatchSize::PerIteration,
            );
        });

        let fixture = TreeFixture::new(label);
        generate_tree(&fixture.source, depth, breadth, files, 4 * 1024);
        let service = SyncService::default();
        service
            .sync(&fixture.source, &fixture.destination)
            .unwrap();

        group.bench_function(BenchmarkId::new("warm", label), |b| {
            b.iter(|| {
                let report = service
                    .sync(&fixture.source, &fixture.destination)
                    .unwrap();
                black_box(report.transfer.file_count)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fingerprint_builder, bench_scan, bench_sync);
criterion_main!(benches);
