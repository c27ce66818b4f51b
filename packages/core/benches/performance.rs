//! Performance benchmarks for Listkeeper core operations
//!
//! Run with: `cargo bench -p listkeeper-core`
//!
//! These benchmarks measure critical path performance:
//! - Sparse ordering (midpoint insertion and renumbering plans)
//! - Hierarchy snapshot construction and walks for a full list
//! - Gated store mutations (revision check + write + bump in one transaction)

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use listkeeper_core::config::StoreConfig;
use listkeeper_core::db::{migrations, DatabaseService};
use listkeeper_core::operations::{
    plan_completion, HierarchyNode, HierarchySnapshot, SiblingKey, SparseOrderAllocator,
};
use listkeeper_core::{CancellationToken, ListStore};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Setup a store over a fresh, migrated database
async fn setup_test_store() -> (ListStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::local(temp_dir.path().join("bench.db"));
    let db = Arc::new(DatabaseService::open(&config.database).await.unwrap());
    migrations::run(&db).await.unwrap();
    let store = ListStore::new(db, &config).await.unwrap();
    (store, temp_dir)
}

/// A list of `roots` top-level items, each with a chain of `depth - 1`
/// descendants
fn generate_snapshot(roots: usize, depth: usize) -> HierarchySnapshot {
    let now = Utc::now();
    let mut nodes = Vec::with_capacity(roots * depth);
    for r in 0..roots {
        let mut parent: Option<String> = None;
        for d in 0..depth {
            let id = format!("item-{}-{}", r, d);
            nodes.push(HierarchyNode {
                id: id.clone(),
                parent_id: parent.clone(),
                is_completed: d + 1 < depth,
                order: (r as i64 + 1) * 1024,
                created_at: now,
            });
            parent = Some(id);
        }
    }
    HierarchySnapshot::from_nodes(nodes)
}

/// Benchmark sparse ordering plans
///
/// `place_after_head` repeatedly bisects the first gap of a 500-item group;
/// `renumber_on_collision` forces the renumber path every iteration.
fn bench_ordering(c: &mut Criterion) {
    let allocator = SparseOrderAllocator::new(1024);
    let siblings: Vec<SiblingKey> = allocator
        .renumber(500)
        .into_iter()
        .enumerate()
        .map(|(i, order)| SiblingKey::new(format!("s{}", i), order))
        .collect();

    let mut group = c.benchmark_group("ordering");

    group.bench_function("place_after_head", |b| {
        b.iter(|| allocator.plan_place_after(black_box(&siblings), "moving", Some("s0")))
    });

    group.bench_function("renumber_on_collision", |b| {
        b.iter(|| allocator.plan_set_order(black_box(&siblings), "moving", 1024))
    });

    group.finish();
}

/// Benchmark hierarchy walks over a 1000-item list
fn bench_hierarchy(c: &mut Criterion) {
    let snapshot = generate_snapshot(200, 5);

    let mut group = c.benchmark_group("hierarchy");

    group.bench_function("from_nodes_1000", |b| {
        b.iter(|| generate_snapshot(black_box(200), 5))
    });

    group.bench_function("flatten_1000", |b| b.iter(|| snapshot.flatten().unwrap()));

    group.bench_function("completion_rollup", |b| {
        b.iter(|| plan_completion(&snapshot, black_box("item-100-4"), true).unwrap())
    });

    group.finish();
}

/// Benchmark gated mutations through the store
///
/// Each iteration reads nothing extra: the returned revision feeds the next
/// call, as a client chaining edits would do.
fn bench_gated_mutations(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("store");
    group.sample_size(20);

    group.bench_function("add_item", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (store, _temp) = setup_test_store().await;
                let cancel = CancellationToken::new();
                let list = store.create_list("bench", "Bench", false, &cancel).await.unwrap();

                let start = std::time::Instant::now();
                for i in 0..iters {
                    black_box(
                        store
                            .add_item(&list.id, &format!("Item {}", i), &cancel)
                            .await
                            .unwrap(),
                    );
                }
                start.elapsed()
            })
        });
    });

    group.bench_function("rename_chain", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (store, _temp) = setup_test_store().await;
                let cancel = CancellationToken::new();
                let list = store.create_list("bench", "Bench", false, &cancel).await.unwrap();
                let item = store.add_item(&list.id, "Target", &cancel).await.unwrap();
                let mut revision = item.new_revision;

                let start = std::time::Instant::now();
                for i in 0..iters {
                    revision = store
                        .rename_item(&item.item_id, &format!("Rename {}", i), revision, &cancel)
                        .await
                        .unwrap()
                        .new_revision;
                }
                start.elapsed()
            })
        });
    });

    group.finish();
}

criterion_group!(benches, bench_ordering, bench_hierarchy, bench_gated_mutations);
criterion_main!(benches);
