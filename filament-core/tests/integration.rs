//! Integration Tests for the Reactive Engine
//!
//! These tests verify that stores, computations, batches and memos work
//! together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use filament_core::reactive::{autorun, batch, memoize, untrack, Memo, ReactiveContext, Runtime};
use filament_core::store::{create_store, StoreList, StoreMap, Value};
use serde_json::json;

fn counter() -> Rc<Cell<usize>> {
    Rc::new(Cell::new(0))
}

/// Test the count scenario: one run on creation, one per real change.
#[test]
fn autorun_follows_store_writes() {
    let store = create_store(json!({"count": 0}));
    let map = store.as_map().unwrap().clone();
    let log = Rc::new(RefCell::new(Vec::new()));

    let (map2, log2) = (map.clone(), log.clone());
    let disposer = autorun(move |_| {
        log2.borrow_mut().push(map2.get("count").as_i64().unwrap_or(-1));
    });
    assert_eq!(*log.borrow(), [0]);

    map.set("count", 5);
    assert_eq!(*log.borrow(), [0, 5]);

    // Same value again: strict inequality gate
    map.set("count", 5);
    assert_eq!(*log.borrow(), [0, 5]);

    disposer.dispose();
}

/// Test that a batch delivers its writes in one pass.
#[test]
fn batch_runs_dependents_once() {
    let store = StoreMap::from_entries([("x", 0), ("y", 0)]);
    let runs = counter();

    let (store2, runs2) = (store.clone(), runs.clone());
    let disposer = autorun(move |_| {
        store2.get("x");
        store2.get("y");
        runs2.set(runs2.get() + 1);
    });

    batch(|| {
        store.set("x", 1);
        store.set("y", 2);
        // Nothing has run yet
        assert_eq!(runs.get(), 1);
    });

    assert_eq!(runs.get(), 2);
    disposer.dispose();
}

/// Test that nested batches only flush at the outermost exit.
#[test]
fn nested_batches_are_transparent() {
    let store = StoreMap::from_entries([("a", 0)]);
    let runs = counter();

    let (store2, runs2) = (store.clone(), runs.clone());
    let disposer = autorun(move |_| {
        store2.get("a");
        runs2.set(runs2.get() + 1);
    });

    let value = batch(|| {
        batch(|| store.set("a", 1));
        assert_eq!(runs.get(), 1);
        store.set("a", 2);
        "done"
    });

    assert_eq!(value, "done");
    assert_eq!(runs.get(), 2);
    disposer.dispose();
}

/// Test that disposal unsubscribes from every property.
#[test]
fn disposed_autorun_does_not_run() {
    let store = StoreMap::from_entries([("a", 0), ("b", 0)]);
    let runs = counter();
    let listeners_before = Runtime::listener_count();

    let (store2, runs2) = (store.clone(), runs.clone());
    let disposer = autorun(move |_| {
        store2.get("a");
        store2.get("b");
        runs2.set(runs2.get() + 1);
    });
    assert_eq!(disposer.dependency_count(), 2);

    disposer.dispose();
    assert_eq!(Runtime::listener_count(), listeners_before);

    store.set("a", 1);
    store.set("b", 1);
    assert_eq!(runs.get(), 1);
}

/// Test that cleanups run before every re-run and at disposal.
#[test]
fn cleanup_precedes_each_rerun() {
    let store = StoreMap::from_entries([("n", 0)]);
    let events = Rc::new(RefCell::new(Vec::new()));

    let (store2, events2) = (store.clone(), events.clone());
    let disposer = autorun(move |on_cleanup| {
        let n = store2.get("n").as_i64().unwrap_or_default();
        events2.borrow_mut().push(format!("run {n}"));
        let events3 = events2.clone();
        on_cleanup.register(move || events3.borrow_mut().push(format!("cleanup {n}")));
    });

    store.set("n", 1);
    disposer.dispose();

    assert_eq!(
        *events.borrow(),
        ["run 0", "cleanup 0", "run 1", "cleanup 1"]
    );
}

/// Test that a computation writing a property it reads sees its own write.
#[test]
fn write_during_own_run_is_not_lost() {
    let store = StoreMap::from_entries([("n", 0)]);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let (store2, seen2) = (store.clone(), seen.clone());
    let disposer = autorun(move |_| {
        let n = store2.get("n").as_i64().unwrap_or_default();
        seen2.borrow_mut().push(n);
        // clamp
        if n > 10 {
            store2.set("n", 10);
        }
    });

    store.set("n", 15);
    assert_eq!(*seen.borrow(), [0, 15, 10]);
    assert_eq!(store.peek("n").as_i64(), Some(10));
    assert_eq!(disposer.run_count(), 3);

    disposer.dispose();
}

/// Test that nested containers keep their identity.
#[test]
fn nested_containers_are_identity_stable() {
    let store = create_store(json!({"todos": [{"title": "a"}]}));
    let root = store.as_map().unwrap();

    let first = root.get("todos");
    let second = root.get("todos");
    assert_eq!(first, second);

    let todo = first.as_list().unwrap().get(0);
    assert_eq!(todo, second.as_list().unwrap().get(0));

    // Assigning a fresh, structurally equal list still counts as a change
    let runs = counter();
    let (root2, runs2) = (root.clone(), runs.clone());
    let disposer = autorun(move |_| {
        root2.get("todos");
        runs2.set(runs2.get() + 1);
    });
    root.set("todos", Value::from(json!([{"title": "a"}])));
    assert_eq!(runs.get(), 2);
    disposer.dispose();
}

/// Test that list mutators notify once per call.
#[test]
fn list_mutation_is_one_pass() {
    let list = StoreList::from_values(vec![3.into(), 1.into(), 2.into()]);
    let lengths = Rc::new(RefCell::new(Vec::new()));

    let (list2, lengths2) = (list.clone(), lengths.clone());
    let disposer = autorun(move |_| {
        lengths2.borrow_mut().push(list2.len());
    });

    list.push(4);
    list.splice(0, 2, Vec::new());
    list.sort_by(|a, b| a.to_text().cmp(&b.to_text()));

    assert_eq!(*lengths.borrow(), [3, 4, 2, 2]);
    disposer.dispose();
}

/// Test that memos are shared within a pass and refreshed by the next flush.
#[test]
fn memo_is_per_cycle() {
    let store = StoreMap::from_entries([("n", 2)]);
    let computes = counter();

    let (store2, computes2) = (store.clone(), computes.clone());
    let squared = Memo::new(move || {
        computes2.set(computes2.get() + 1);
        let n = store2.get("n").as_i64().unwrap_or_default();
        n * n
    });

    let seen = Rc::new(RefCell::new(Vec::new()));
    let (squared2, seen2) = (squared.clone(), seen.clone());
    let first = autorun(move |_| seen2.borrow_mut().push(squared2.get()));
    let (squared3, seen3) = (squared.clone(), seen.clone());
    let second = autorun(move |_| seen3.borrow_mut().push(squared3.get() + 1));

    assert_eq!(computes.get(), 1);
    assert_eq!(*seen.borrow(), [4, 5]);

    store.set("n", 3);
    assert_eq!(computes.get(), 2);
    assert_eq!(*seen.borrow(), [4, 5, 9, 10]);

    first.dispose();
    second.dispose();
}

/// Test the implicit per-closure cache.
#[test]
fn memoize_caches_per_closure() {
    let store = StoreMap::from_entries([("n", 1), ("m", 2)]);
    let computes = Rc::new(Cell::new(0));

    let field = |name: &'static str| {
        let (store, computes) = (store.clone(), computes.clone());
        Rc::new(move || {
            computes.set(computes.get() + 1);
            store.get(name).as_i64().unwrap_or_default()
        })
    };
    let n = field("n");
    let m = field("m");

    assert_eq!(memoize(&n), 1);
    assert_eq!(memoize(&n), 1);
    assert_eq!(memoize(&m), 2);
    assert_eq!(computes.get(), 2);

    store.set("n", 7);
    assert_eq!(memoize(&n), 7);
    assert_eq!(memoize(&m), 2);
    assert_eq!(computes.get(), 4);
}

/// Test that untracked reads never subscribe.
#[test]
fn untracked_reads_do_not_subscribe() {
    let store = StoreMap::from_entries([("a", 0), ("b", 0)]);
    let runs = counter();

    let (store2, runs2) = (store.clone(), runs.clone());
    let disposer = autorun(move |_| {
        store2.get("a");
        untrack(|| store2.get("b"));
        store2.peek("b");
        runs2.set(runs2.get() + 1);
    });

    store.set("b", 1);
    assert_eq!(runs.get(), 1);
    store.set("a", 1);
    assert_eq!(runs.get(), 2);
    disposer.dispose();
}

/// Test that ReactiveContext restores the observer after nested runs.
#[test]
fn nested_autoruns_restore_the_observer() {
    let store = StoreMap::from_entries([("outer", 0), ("inner", 0)]);
    let outer_runs = counter();
    let inner_disposers = Rc::new(RefCell::new(Vec::new()));

    let (store2, outer_runs2, inner2) = (store.clone(), outer_runs.clone(), inner_disposers.clone());
    let outer = autorun(move |_| {
        let store3 = store2.clone();
        inner2
            .borrow_mut()
            .push(autorun(move |_| {
                store3.get("inner");
            }));
        // read after the nested run: must still be tracked by the outer one
        store2.get("outer");
        outer_runs2.set(outer_runs2.get() + 1);
    });

    assert!(!ReactiveContext::is_active());
    store.set("inner", 1);
    assert_eq!(outer_runs.get(), 1);
    store.set("outer", 1);
    assert_eq!(outer_runs.get(), 2);

    outer.dispose();
    for disposer in inner_disposers.borrow().iter() {
        disposer.dispose();
    }
}

// Note: the following test demonstrates the serde bridge. Stores are plain
// observable data, so any serializable type can seed one and any
// deserializable type can be read back out of one.

#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct Settings {
    theme: String,
    font_size: u32,
}

/// Test a full round trip through a store.
#[test]
fn serde_round_trip_through_store() {
    let store = filament_core::store::from_serialize(&Settings {
        theme: "dark".into(),
        font_size: 12,
    })
    .unwrap();

    let observed = Rc::new(RefCell::new(String::new()));
    let (store2, observed2) = (store.clone(), observed.clone());
    let disposer = autorun(move |_| {
        *observed2.borrow_mut() = store2.as_map().unwrap().get("theme").to_text();
    });

    store.as_map().unwrap().set("theme", "light");
    assert_eq!(*observed.borrow(), "light");

    let settings: Settings = store.deserialize().unwrap();
    assert_eq!(
        settings,
        Settings {
            theme: "light".into(),
            font_size: 12
        }
    );
    disposer.dispose();
}
