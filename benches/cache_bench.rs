//! Event cache and merge throughput benchmarks.
//!
//! # Groups
//!
//! | Group | What it measures |
//! |-------|-----------------|
//! | `cache` | `has` + `add` per event at several thresholds, including resets |
//! | `cache_contended` | The same with 1, 4 and 8 threads sharing one cache |
//! | `session` | A bounded session over the in-memory API, end to end |
//!
//! # Viewing results
//!
//! ```sh
//! cargo bench --bench cache_bench
//! open target/criterion/report/index.html
//! ```

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cwtail_core::{Event, EventCache};
use cwtail_engine::{MockLogApi, SessionConfig, TailSession};

const IDS: usize = 10_000;

fn ids() -> Vec<String> {
    (0..IDS).map(|i| format!("3{i:055}")).collect()
}

// ---------------------------------------------------------------------------
// Single-threaded
// ---------------------------------------------------------------------------

fn cache_bench(c: &mut Criterion) {
    let ids = ids();
    let mut group = c.benchmark_group("cache");
    group.throughput(Throughput::Elements(IDS as u64));

    for threshold in [1_000usize, 5_000, 20_000] {
        group.bench_with_input(BenchmarkId::new("has_add", threshold), &threshold, |b, &t| {
            b.iter(|| {
                let cache = EventCache::new(t);
                for id in &ids {
                    if !cache.has(id) {
                        cache.add(id.as_str());
                    }
                    cache.reset_if_full();
                }
                black_box(cache.size())
            })
        });
    }

    // Every id seen twice, as overlapping polls produce.
    group.bench_function("duplicates", |b| {
        b.iter(|| {
            let cache = EventCache::new(5_000);
            let mut emitted = 0usize;
            for id in ids.iter().chain(ids.iter()).take(IDS) {
                if !cache.has(id) {
                    cache.add(id.as_str());
                    emitted += 1;
                }
            }
            black_box(emitted)
        })
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Contended
// ---------------------------------------------------------------------------

fn contended_bench(c: &mut Criterion) {
    let ids = Arc::new(ids());
    let mut group = c.benchmark_group("cache_contended");
    group.throughput(Throughput::Elements(IDS as u64));

    for threads in [1usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &n| {
            b.iter(|| {
                let cache = Arc::new(EventCache::new(5_000));
                let per_thread = IDS / n;
                std::thread::scope(|s| {
                    for t in 0..n {
                        let cache = Arc::clone(&cache);
                        let ids = Arc::clone(&ids);
                        s.spawn(move || {
                            for id in &ids[t * per_thread..(t + 1) * per_thread] {
                                if !cache.has(id) {
                                    cache.add(id.as_str());
                                }
                            }
                        });
                    }
                });
                black_box(cache.size())
            })
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

fn session_bench(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("session");
    group.sample_size(20);

    for events in [100usize, 1_000] {
        group.throughput(Throughput::Elements(events as u64));
        group.bench_with_input(BenchmarkId::new("bounded", events), &events, |b, &n| {
            b.to_async(&rt).iter(|| async move {
                let api = Arc::new(MockLogApi::new());
                for i in 0..n {
                    api.push_event(Event {
                        event_id: format!("e{i}"),
                        timestamp: i as i64,
                        message: "GET /api/v1/orders 200 47ms".into(),
                        group: "app".into(),
                        stream: "web-1".into(),
                    });
                }
                let mut handle = TailSession::start(
                    api,
                    SessionConfig::bounded(0, n as i64),
                    vec!["app".parse().expect("valid source")],
                );
                let mut received = 0usize;
                while handle.recv().await.is_some() {
                    received += 1;
                }
                handle.finish().await.expect("session succeeds");
                black_box(received)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, cache_bench, contended_bench, session_bench);
criterion_main!(benches);
