//! Benchmarks for steady-state digests and list reconciliation.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use watchtree::accessor::path;
use watchtree::{MemoryRenderer, Repeat, RepeatTarget, ScopeTree, SharedRenderer, Value};

/// A root with `n` children, each watching one inherited and one local binding.
fn watched_tree(n: usize) -> ScopeTree {
    let mut tree = ScopeTree::new();
    let root = tree.root();
    tree.set(root, "title", Value::text("Contacts")).unwrap();
    for i in 0..n {
        let child = tree.create_child(root).unwrap();
        tree.set(child, "index", Value::int(i as i64)).unwrap();
        tree.watch(child, path("title").unwrap(), |_, _, _| {}).unwrap();
        tree.watch(child, path("index").unwrap(), |_, _, _| {}).unwrap();
    }
    tree.digest_root().unwrap();
    tree
}

/// Digest with nothing changed: one clean pass over every watcher.
fn bench_steady_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("steady_state_digest");

    for n in [10, 100, 1000] {
        let mut tree = watched_tree(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(tree.digest_root().unwrap()));
        });
    }

    group.finish();
}

/// Append `n` items one digest at a time, as a list view fed by user input.
fn bench_growing_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("growing_list");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut tree = ScopeTree::new();
                let root = tree.root();
                let items = Value::list([]);
                tree.set(root, "items", items.clone()).unwrap();

                let renderer: SharedRenderer = MemoryRenderer::shared();
                let target = RepeatTarget {
                    parent: watchtree::NodeId(0),
                    anchor: None,
                };
                let repeat = Repeat::builder("item", renderer, target)
                    .attach(&mut tree, root, path("items").unwrap())
                    .unwrap();

                for i in 0..n {
                    items.push(Value::int(i as i64));
                    tree.digest_root().unwrap();
                }
                black_box(repeat.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_steady_state, bench_growing_list);
criterion_main!(benches);
