//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects store properties to
//! computations. It owns the listener index, the registry of live
//! computations, the batch queue and the change counter.
//!
//! # How It Works
//!
//! 1. A computation registers with the runtime when it is created.
//!
//! 2. When a computation reads a store property, the runtime records the edge
//!    in both the listener index and the computation's own subscription set.
//!
//! 3. When a property is written with a different value, the runtime:
//!    a. Queues the notification if a batch is open, or
//!    b. Flushes it right away: bumps the change counter, collects the
//!       listeners and re-runs each live one once.
//!
//! 4. Disposing a computation removes all of its edges and drops it from the
//!    registry, so later flushes cannot reach it.
//!
//! # Threading
//!
//! All state is thread-local. The runtime has exactly one logical thread of
//! execution; sharing stores or instances across threads is not supported.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexSet;
use tracing::{debug, error, trace};

use super::context::ReactiveContext;
use super::effect::Computation;
use super::subscriber::ComputationId;
use crate::config::config;
use crate::graph::{Dep, ListenerIndex, NotifyQueue, ObjectId};

thread_local! {
    static STATE: RuntimeState = RuntimeState::default();
}

#[derive(Default)]
struct RuntimeState {
    computations: RefCell<HashMap<ComputationId, Rc<Computation>>>,
    listeners: RefCell<ListenerIndex>,
    queue: RefCell<NotifyQueue>,
    change_id: Cell<u64>,
    depth: Cell<usize>,
}

/// Entry points into the thread's reactive runtime.
pub struct Runtime;

impl Runtime {
    pub(crate) fn register(computation: Rc<Computation>) {
        STATE.with(|state| {
            state
                .computations
                .borrow_mut()
                .insert(computation.id(), computation);
        });
    }

    pub(crate) fn unregister(id: ComputationId) -> Option<Rc<Computation>> {
        STATE.with(|state| state.computations.borrow_mut().remove(&id))
    }

    pub(crate) fn get(id: ComputationId) -> Option<Rc<Computation>> {
        STATE.with(|state| state.computations.borrow().get(&id).cloned())
    }

    /// Record that the current computation read `dep`.
    ///
    /// Outside of a computation this only feeds memo recording.
    pub fn track(dep: Dep) {
        ReactiveContext::record(&dep);

        let Some(observer) = ReactiveContext::current_observer() else {
            return;
        };
        let Some(computation) = Self::get(observer) else {
            return;
        };

        if computation.add_subscription(&dep) {
            trace!(%dep, computation = %observer, "tracked dependency");
            STATE.with(|state| state.listeners.borrow_mut().subscribe(&dep, observer));
        }
    }

    /// Report that `dep` changed.
    ///
    /// Inside a batch the notification is queued; otherwise it is flushed
    /// synchronously before this returns.
    pub fn notify(dep: Dep) {
        let unqueued = STATE.with(|state| {
            let mut queue = state.queue.borrow_mut();
            if queue.is_batching() {
                queue.push(dep);
                None
            } else {
                Some(dep)
            }
        });

        if let Some(dep) = unqueued {
            flush(vec![dep]);
        }
    }

    pub(crate) fn unsubscribe(id: ComputationId, deps: impl IntoIterator<Item = Dep>) {
        STATE.with(|state| {
            let mut listeners = state.listeners.borrow_mut();
            for dep in deps {
                listeners.unsubscribe(&dep, id);
            }
        });
    }

    pub(crate) fn tracked_indices(object: ObjectId) -> Vec<usize> {
        STATE.with(|state| state.listeners.borrow().tracked_indices(object))
    }

    /// The global change counter, bumped once per notification flush.
    pub fn change_id() -> u64 {
        STATE.with(|state| state.change_id.get())
    }

    /// Whether a batch is currently open.
    pub fn is_batching() -> bool {
        STATE.with(|state| state.queue.borrow().is_batching())
    }

    /// The computation reads are currently attributed to.
    pub fn current_computation() -> Option<ComputationId> {
        ReactiveContext::current_observer()
    }

    /// Total number of `(object, property) -> computation` edges.
    pub fn listener_count() -> usize {
        STATE.with(|state| state.listeners.borrow().edge_count())
    }

    /// Number of live (undisposed) computations.
    pub fn computation_count() -> usize {
        STATE.with(|state| state.computations.borrow().len())
    }
}

/// Run `f` with notifications deferred until the outermost batch exits.
///
/// Nested batches are transparent. A property written several times inside
/// the batch notifies its listeners once, and a computation depending on
/// several written properties re-runs once.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let was_batching = STATE.with(|state| state.queue.borrow_mut().set_batching(true));
    let guard = BatchGuard {
        outermost: !was_batching,
    };

    let result = f();
    drop(guard);

    if !was_batching {
        let pending = STATE.with(|state| state.queue.borrow_mut().drain());
        if !pending.is_empty() {
            flush(pending);
        }
    }

    result
}

/// Resets the batching flag when the outermost batch exits, even by unwinding.
struct BatchGuard {
    outermost: bool,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if !self.outermost {
            return;
        }
        STATE.with(|state| {
            let mut queue = state.queue.borrow_mut();
            queue.set_batching(false);
            if std::thread::panicking() {
                queue.discard();
            }
        });
    }
}

/// Tracks the nesting of synchronous flushes.
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        STATE.with(|state| state.depth.set(state.depth.get() + 1));
        DepthGuard
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        STATE.with(|state| state.depth.set(state.depth.get().saturating_sub(1)));
    }
}

/// Deliver one notification pass for `deps`.
fn flush(deps: Vec<Dep>) {
    let (change_id, ids) = STATE.with(|state| {
        // bump first so memos re-read by this pass see the new values
        let change_id = state.change_id.get() + 1;
        state.change_id.set(change_id);

        let listeners = state.listeners.borrow();
        let mut ids = IndexSet::new();
        for dep in &deps {
            ids.extend(listeners.listeners(dep));
        }
        (change_id, ids)
    });

    if ids.is_empty() {
        return;
    }

    let depth = STATE.with(|state| state.depth.get());
    let max_depth = config().max_notify_depth;
    if depth >= max_depth {
        error!(
            depth,
            max_depth,
            deps = deps.len(),
            "notification depth exceeded; dropping flush"
        );
        return;
    }

    let _depth = DepthGuard::enter();
    debug!(
        change_id,
        deps = deps.len(),
        computations = ids.len(),
        "flushing notifications"
    );

    for id in ids {
        // a re-run earlier in this pass may have disposed later listeners
        if let Some(computation) = Runtime::get(id) {
            computation.execute();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropKey;
    use crate::reactive::autorun;

    #[test]
    fn notify_reruns_listeners() {
        let object = ObjectId::new();
        let dep = Dep::new(object, PropKey::field("a"));
        let runs = Rc::new(Cell::new(0));

        let dep_clone = dep.clone();
        let runs_clone = runs.clone();
        let disposer = autorun(move |_| {
            Runtime::track(dep_clone.clone());
            runs_clone.set(runs_clone.get() + 1);
        });

        assert_eq!(runs.get(), 1);
        Runtime::notify(dep.clone());
        assert_eq!(runs.get(), 2);

        disposer.dispose();
        Runtime::notify(dep);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn flush_bumps_change_id() {
        let before = Runtime::change_id();
        Runtime::notify(Dep::new(ObjectId::new(), PropKey::Length));
        assert_eq!(Runtime::change_id(), before + 1);
    }

    #[test]
    fn batch_defers_and_deduplicates() {
        let object = ObjectId::new();
        let a = Dep::new(object, PropKey::field("a"));
        let b = Dep::new(object, PropKey::field("b"));
        let runs = Rc::new(Cell::new(0));

        let (a2, b2, runs2) = (a.clone(), b.clone(), runs.clone());
        let _disposer = autorun(move |_| {
            Runtime::track(a2.clone());
            Runtime::track(b2.clone());
            runs2.set(runs2.get() + 1);
        });

        let change_id = Runtime::change_id();
        batch(|| {
            Runtime::notify(a.clone());
            batch(|| Runtime::notify(b.clone()));
            Runtime::notify(a.clone());
            assert!(Runtime::is_batching());
            assert_eq!(runs.get(), 1);
            assert_eq!(Runtime::change_id(), change_id);
        });

        assert!(!Runtime::is_batching());
        assert_eq!(runs.get(), 2);
        assert_eq!(Runtime::change_id(), change_id + 1);
    }

    #[test]
    fn batch_flag_resets_after_panic() {
        let result = std::panic::catch_unwind(|| {
            batch(|| {
                Runtime::notify(Dep::new(ObjectId::new(), PropKey::Length));
                panic!("boom");
            })
        });

        assert!(result.is_err());
        assert!(!Runtime::is_batching());
    }

    #[test]
    fn depth_limit_stops_runaway_flushes() {
        crate::config::configure(crate::config::Config::new().with_max_notify_depth(3));

        let dep = Dep::new(ObjectId::new(), PropKey::field("loop"));
        let runs = Rc::new(Cell::new(0));

        // Two computations that keep re-notifying each other's dependency.
        let mut disposers = Vec::new();
        for _ in 0..2 {
            let (dep, runs) = (dep.clone(), runs.clone());
            disposers.push(autorun(move |_| {
                Runtime::track(dep.clone());
                runs.set(runs.get() + 1);
                if runs.get() > 2 {
                    Runtime::notify(dep.clone());
                }
            }));
        }

        Runtime::notify(dep);
        // nested flushes and deferred re-runs are both bounded by the depth
        assert!(runs.get() < 1_000);

        for disposer in disposers {
            disposer.dispose();
        }
        crate::config::configure(crate::config::Config::default());
    }
}
