//! Criterion benchmarks for svcs-core.
//!
//! ## Benchmark groups
//!
//! 1. **extract**: Parsing and declaration extraction at several file sizes.
//! 2. **diff**: Snapshot comparison, identical and heavily changed.
//! 3. **commit**: Canonical serialization, hashing, and history walks
//!    against the in-memory store.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/svcs-core/Cargo.toml
//! # Run only the diff group:
//! cargo bench --manifest-path crates/svcs-core/Cargo.toml -- diff
//! ```

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use svcs_core::diff::diff;
use svcs_core::extract::extract;
use svcs_core::store::repository::Repository;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a synthetic module with `n` functions, `n / 4` classes with three
/// methods each, `n` constants, and a fixed import block. `variant` shifts
/// return values and defaults so two variants diff non-trivially.
fn synthetic_module(n: usize, variant: usize) -> String {
    let mut source = String::from("import os\nimport sys\nfrom typing import Dict, List as L\n\n");
    for i in 0..n {
        source.push_str(&format!(
            "def func_{i}(a, b={d}, *args, **kwargs):\n    if a:\n        return a + {v}\n    return [b, {i}]\n\n",
            d = i + variant,
            v = i * (variant + 1),
        ));
    }
    for c in 0..n / 4 {
        let base = if variant % 2 == 0 { "Base" } else { "Other" };
        source.push_str(&format!("class Service{c}({base}):\n"));
        for m in 0..3 {
            source.push_str(&format!(
                "    def method_{m}(self, x):\n        return self.value * x + {}\n",
                m + variant
            ));
        }
        source.push('\n');
    }
    for i in 0..n {
        source.push_str(&format!("CONST_{i} = {}\n", i * 10 + variant));
    }
    source
}

// ---------------------------------------------------------------------------
// 1. extract
// ---------------------------------------------------------------------------

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    for n in [10usize, 100, 500] {
        let source = synthetic_module(n, 0);
        group.bench_with_input(BenchmarkId::new("synthetic_module", n), &source, |b, src| {
            b.iter(|| extract(black_box(src)).unwrap());
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 2. diff
// ---------------------------------------------------------------------------

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");

    for n in [10usize, 100, 500] {
        let old = extract(&synthetic_module(n, 0)).unwrap();
        let same = old.clone();
        let changed = extract(&synthetic_module(n, 1)).unwrap();

        group.bench_with_input(BenchmarkId::new("identical", n), &n, |b, _| {
            b.iter(|| diff(black_box(&old), black_box(&same)));
        });
        group.bench_with_input(BenchmarkId::new("all_changed", n), &n, |b, _| {
            b.iter(|| diff(black_box(&old), black_box(&changed)));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 3. commit
// ---------------------------------------------------------------------------

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");

    let snapshot = extract(&synthetic_module(100, 0)).unwrap();
    let changes = diff(&Default::default(), &snapshot);

    group.bench_function("commit_in_memory_100_decls", |b| {
        let repo = Repository::in_memory();
        let mut tick = 0i64;
        b.iter(|| {
            tick += 1;
            let at = Utc.timestamp_opt(1_700_000_000 + tick, 0).unwrap();
            repo.commit_at(
                "bench.py",
                snapshot.clone(),
                changes.clone(),
                "bench",
                "bench",
                at,
            )
            .unwrap()
        });
    });

    group.bench_function("history_walk_50", |b| {
        let repo = Repository::in_memory();
        for i in 0..50 {
            let at = Utc.timestamp_opt(1_700_000_000 + i, 0).unwrap();
            repo.commit_at("bench.py", snapshot.clone(), vec![], "bench", "bench", at)
                .unwrap();
        }
        b.iter(|| black_box(repo.history("bench.py", None).unwrap()));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Register all benchmark groups
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_extract, bench_diff, bench_commit);
criterion_main!(benches);
