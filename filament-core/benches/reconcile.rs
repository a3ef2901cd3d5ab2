//! Keyed reconciliation benchmarks.

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use filament_core::instance::ReactiveContent;
use filament_core::render::{Child, MemoryTree, Region};
use filament_core::store::{StoreList, Value};

const ROWS: usize = 1_000;

fn rows(list: &StoreList) -> Vec<Child> {
    list.to_vec()
        .into_iter()
        .map(|value| {
            let text = value.to_text();
            Child::keyed(value.as_i64().unwrap_or_default(), move || text)
        })
        .collect()
}

fn setup() -> (Rc<MemoryTree>, StoreList, ReactiveContent) {
    let tree = Rc::new(MemoryTree::new());
    let root = tree.create_element("tbody");
    let list = StoreList::from_values((0..ROWS).map(Value::from).collect());
    let content = ReactiveContent::new(Region::new(tree.clone(), root), None, false);
    let list2 = list.clone();
    content
        .bind(move || rows(&list2))
        .expect("initial render");
    (tree, list, content)
}

fn bench_keyed(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed");

    group.bench_function("reverse", |b| {
        b.iter_batched(
            setup,
            |(tree, list, content)| {
                list.reverse();
                black_box(tree.stats());
                content.dispose();
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("swap_rows", |b| {
        b.iter_batched(
            setup,
            |(tree, list, content)| {
                let first = list.peek_at(1);
                let last = list.peek_at(ROWS - 2);
                filament_core::reactive::batch(|| {
                    list.set(1, last);
                    list.set(ROWS - 2, first);
                });
                black_box(tree.stats());
                content.dispose();
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("append_100", |b| {
        b.iter_batched(
            setup,
            |(tree, list, content)| {
                list.splice(ROWS, 0, (ROWS..ROWS + 100).map(Value::from).collect());
                black_box(tree.stats());
                content.dispose();
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("unchanged_rerun", |b| {
        b.iter_batched(
            setup,
            |(tree, list, content)| {
                // same keys, fresh list: exercises the early exit
                let values = list.peek_all();
                list.splice(0, ROWS, values);
                black_box(tree.stats());
                content.dispose();
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_keyed);
criterion_main!(benches);
