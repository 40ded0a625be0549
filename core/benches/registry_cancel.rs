//! Cost of subtree cancellation, which scans the flat registry once per
//! visited node.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tasklog_core::TaskRegistry;
use tokio_util::sync::CancellationToken;

/// `width` roots, each with a chain of `depth` descendants.
fn build(width: usize, depth: usize) -> TaskRegistry {
    let reg = TaskRegistry::new();
    for w in 0..width {
        let mut parent: Option<String> = None;
        for d in 0..depth {
            let id = format!("task-b-{w}-{d}");
            reg.insert(&id, CancellationToken::new(), parent.clone())
                .unwrap();
            parent = Some(id);
        }
    }
    reg
}

fn bench_cancel_subtree(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel_subtree");

    for &(width, depth) in &[(10, 4), (100, 4), (100, 16)] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{depth}")),
            &(width, depth),
            |b, &(width, depth)| {
                b.iter_batched(
                    || build(width, depth),
                    |reg| black_box(reg.cancel_task("task-b-0-0")),
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_cancel_all(c: &mut Criterion) {
    c.bench_function("cancel_all_1000", |b| {
        b.iter_batched(
            || build(250, 4),
            |reg| black_box(reg.cancel_all()),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_cancel_subtree, bench_cancel_all);
criterion_main!(benches);
