//! Computation Engine
//!
//! A computation is the minimal reactive scope: it runs a closure while
//! tracking every store property the closure reads, and re-runs it whenever
//! one of those properties changes.
//!
//! # Lifecycle
//!
//! 1. [`autorun`] creates the computation and runs it once, synchronously.
//!
//! 2. When a dependency changes, the runtime re-runs it. Before the re-run,
//!    the cleanups registered during the previous run are invoked and every
//!    subscription is dropped, so a branch that is no longer taken stops
//!    being a dependency.
//!
//! 3. [`Disposer::dispose`] invokes the last cleanups, removes every
//!    subscription from the listener index and unregisters the computation.
//!    Disposal is idempotent.
//!
//! # Cleanup
//!
//! The closure receives an [`OnCleanup`] handle. Cleanups registered through
//! it run before the next run and when the computation is disposed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{debug, error, trace};

use super::context::{untrack, ReactiveContext};
use super::runtime::Runtime;
use super::subscriber::ComputationId;
use crate::config::config;
use crate::graph::Dep;

type EffectFn = Box<dyn FnMut(&OnCleanup)>;
type CleanupFn = Box<dyn FnOnce()>;

/// A tracked unit of reactive work.
pub(crate) struct Computation {
    id: ComputationId,

    /// The effect closure. Taken out while it runs.
    run: RefCell<Option<EffectFn>>,

    /// Cleanups registered during the last run.
    cleanups: RefCell<SmallVec<[CleanupFn; 1]>>,

    /// Properties read during the current run.
    subscriptions: RefCell<IndexSet<Dep>>,

    disposed: Cell<bool>,
    running: Cell<bool>,
    /// Notified while running; re-run once the current run finishes.
    pending: Cell<bool>,
    run_count: Cell<usize>,
}

impl Computation {
    fn new(run: EffectFn) -> Self {
        Self {
            id: ComputationId::new(),
            run: RefCell::new(Some(run)),
            cleanups: RefCell::new(SmallVec::new()),
            subscriptions: RefCell::new(IndexSet::new()),
            disposed: Cell::new(false),
            running: Cell::new(false),
            pending: Cell::new(false),
            run_count: Cell::new(0),
        }
    }

    pub(crate) fn id(&self) -> ComputationId {
        self.id
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Add `dep` to the subscription set. Returns `true` if it is new.
    pub(crate) fn add_subscription(&self, dep: &Dep) -> bool {
        !self.disposed.get() && self.subscriptions.borrow_mut().insert(dep.clone())
    }

    /// Cleanups run untracked, so their reads never subscribe whichever
    /// computation happens to be running them.
    fn run_cleanups(&self) {
        let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
        for cleanup in cleanups {
            untrack(cleanup);
        }
    }

    fn clear_subscriptions(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        Runtime::unsubscribe(self.id, subscriptions);
    }

    /// Run (or re-run) the effect closure.
    ///
    /// A notification that arrives while the closure is running is not
    /// lost: it marks the computation pending, and the run that is in
    /// progress re-runs once more after it finishes. Consecutive re-runs are
    /// bounded by [`Config::max_notify_depth`](crate::config::Config).
    pub(crate) fn execute(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        if self.running.get() {
            trace!(computation = %self.id, "notified during its own run; re-run deferred");
            self.pending.set(true);
            return;
        }

        let limit = config().max_notify_depth;
        let mut reruns = 0;
        loop {
            self.run_once();
            if !self.pending.replace(false) || self.disposed.get() {
                break;
            }
            reruns += 1;
            if reruns > limit {
                error!(
                    computation = %self.id,
                    limit,
                    "computation kept invalidating itself; re-run dropped"
                );
                break;
            }
        }
    }

    fn run_once(self: &Rc<Self>) {
        self.run_cleanups();
        self.clear_subscriptions();
        if self.disposed.get() {
            // a cleanup disposed us
            return;
        }

        let Some(run) = self.run.borrow_mut().take() else {
            return;
        };

        let mut guard = RunGuard {
            computation: self,
            run: Some(run),
        };
        self.running.set(true);

        let handle = OnCleanup {
            computation: Rc::downgrade(self),
        };
        {
            let _ctx = ReactiveContext::enter(self.id);
            if let Some(run) = guard.run.as_mut() {
                run(&handle);
            }
        }

        self.run_count.set(self.run_count.get() + 1);
    }

    /// Invoke the last cleanups and drop every subscription.
    pub(crate) fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.pending.set(false);
        debug!(computation = %self.id, runs = self.run_count.get(), "disposing computation");

        self.run_cleanups();
        self.clear_subscriptions();

        // None while the closure is running; its run guard drops it instead.
        let run = self.run.borrow_mut().take();
        let registered = Runtime::unregister(self.id);
        drop(run);
        drop(registered);
    }
}

/// Clears the running flag and puts the closure back after a run.
struct RunGuard<'a> {
    computation: &'a Computation,
    run: Option<EffectFn>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.computation.running.set(false);
        if !self.computation.disposed.get() {
            *self.computation.run.borrow_mut() = self.run.take();
        }
    }
}

/// Disposes a computation whose first run unwound.
struct DisposeOnUnwind<'a>(&'a Computation);

impl Drop for DisposeOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.dispose();
        }
    }
}

/// Handle passed to an effect for registering cleanups.
pub struct OnCleanup {
    computation: Weak<Computation>,
}

impl OnCleanup {
    /// Register a cleanup to run before the next run, or at disposal.
    ///
    /// If the computation has already been disposed the cleanup runs
    /// immediately.
    pub fn register(&self, cleanup: impl FnOnce() + 'static) {
        match self.computation.upgrade() {
            Some(computation) if !computation.is_disposed() => {
                computation.cleanups.borrow_mut().push(Box::new(cleanup));
            }
            _ => untrack(cleanup),
        }
    }
}

/// Handle that stops a computation.
///
/// Dropping a `Disposer` does not stop the computation; call
/// [`Disposer::dispose`].
#[derive(Clone)]
pub struct Disposer {
    computation: Rc<Computation>,
}

impl Disposer {
    /// Stop the computation. Calling this more than once is a no-op.
    pub fn dispose(&self) {
        self.computation.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.computation.is_disposed()
    }

    pub fn id(&self) -> ComputationId {
        self.computation.id
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.computation.run_count.get()
    }

    /// Number of properties the computation currently depends on.
    pub fn dependency_count(&self) -> usize {
        self.computation.subscriptions.borrow().len()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("id", &self.computation.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Run `effect` now and again whenever a store property it read changes.
///
/// # Example
///
/// ```rust,ignore
/// let store = StoreMap::new();
/// store.set("count", 0);
///
/// let disposer = autorun(move |_| {
///     println!("count is {:?}", store.get("count"));
/// });
///
/// disposer.dispose();
/// ```
pub fn autorun<F>(effect: F) -> Disposer
where
    F: FnMut(&OnCleanup) + 'static,
{
    let computation = Rc::new(Computation::new(Box::new(effect)));
    Runtime::register(computation.clone());

    {
        let _armed = DisposeOnUnwind(&computation);
        computation.execute();
    }

    Disposer { computation }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
