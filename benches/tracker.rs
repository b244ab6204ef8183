//! Benchmark tests for netdrop tracker operations
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use netdrop::model::live_progress::LiveProgress;
use netdrop::model::snapshot::TrackerSnapshot;
use netdrop::model::source_file::SourceFile;
use netdrop::model::upload_record::{RecordId, UploadRecord};
use netdrop::services::transport::{Transfer, Transport, TransportEvent, TransportResponse};
use netdrop::services::upload_tracker::UploadTracker;
use netdrop::settings::base_address::BaseAddress;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Answers every request instantly after a fixed number of progress events
struct InstantTransport {
    steps: u64,
}

impl Transport for InstantTransport {
    fn send(&self, file: &SourceFile, _endpoint: &str) -> Transfer {
        let (tx, rx) = mpsc::unbounded_channel();
        for step in 1..=self.steps {
            let _ = tx.send(TransportEvent::Progress {
                loaded: file.size * step / self.steps,
                total: file.size,
            });
        }
        let _ = tx.send(TransportEvent::Response(TransportResponse {
            status: 200,
            reason: "OK".to_string(),
            body: r#"{"success":true,"file_hash":"bench"}"#.to_string(),
        }));
        Transfer::detached(rx)
    }
}

fn create_files(count: usize) -> Vec<SourceFile> {
    (0..count)
        .map(|i| SourceFile::new(format!("/path/to/file-{}.bin", i), 1_048_576))
        .collect()
}

fn create_snapshot(count: usize) -> TrackerSnapshot {
    let records = create_files(count)
        .iter()
        .enumerate()
        .map(|(i, file)| {
            let mut record = UploadRecord::pending(RecordId::from(i as u64), file);
            record.begin();
            record.apply_sample((i % 100) as u64 * 10_000, file.size, Duration::from_secs(1));
            record
        })
        .collect();
    TrackerSnapshot {
        records,
        is_uploading: true,
    }
}

fn bench_progress_estimates(c: &mut Criterion) {
    let mut group = c.benchmark_group("progress_estimates");

    group.bench_function("from_sample", |b| {
        b.iter(|| {
            LiveProgress::from_sample(
                black_box(524_288),
                black_box(1_048_576),
                black_box(Duration::from_millis(750)),
            )
        });
    });

    group.bench_function("apply_sample_series", |b| {
        b.iter(|| {
            let mut record =
                UploadRecord::pending(RecordId::from(1), &SourceFile::new("/tmp/a.bin", 1_000_000));
            record.begin();
            for step in 0..100u64 {
                record.apply_sample(step * 10_000, 1_000_000, Duration::from_millis(step * 10));
            }
            black_box(record.progress())
        });
    });

    group.finish();
}

fn bench_snapshot_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_queries");

    for size in [10, 100, 1000].iter() {
        let snapshot = create_snapshot(*size);

        group.bench_with_input(BenchmarkId::new("overall_progress", size), size, |b, _| {
            b.iter(|| black_box(snapshot.overall_progress()));
        });

        group.bench_with_input(BenchmarkId::new("clone", size), size, |b, _| {
            b.iter(|| black_box(snapshot.clone()));
        });

        group.bench_with_input(BenchmarkId::new("serialize_json", size), size, |b, _| {
            b.iter(|| black_box(serde_json::to_string(&snapshot.records).unwrap_or_default()));
        });
    }

    group.finish();
}

fn bench_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for size in [10, 100].iter() {
        group.bench_with_input(BenchmarkId::new("batch", size), size, |b, &size| {
            b.to_async(&runtime).iter(|| async move {
                let base = BaseAddress::parse("http://localhost:8000").unwrap();
                let (tracker, _rx) =
                    UploadTracker::new(base, Arc::new(InstantTransport { steps: 10 }), true);
                black_box(tracker.enqueue(create_files(size)).await)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_progress_estimates,
    bench_snapshot_queries,
    bench_enqueue,
);
criterion_main!(benches);
