//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a store property is read,
//! the current computation is subscribed to it.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Entering a computation pushes a
//! frame naming it as the observer; leaving pops it. Nested computations push
//! their own frames, so the previous observer is restored automatically.
//!
//! Every frame also records the dependencies read while it is on top. Memos
//! use this to learn what their computation read, so a cached value can replay
//! those reads into whichever computation asks for it next.
//!
//! Frames are popped by a guard, so the stack stays balanced even if the
//! computation panics.

use std::cell::RefCell;

use super::ComputationId;
use crate::graph::Dep;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = RefCell::new(Vec::new());
}

/// An entry in the reactive context stack.
#[derive(Debug, Clone)]
struct ContextEntry {
    /// The computation that reads are attributed to, if any.
    observer: Option<ComputationId>,
    /// Dependencies read while this frame was on top.
    dependencies: Vec<Dep>,
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    observer: Option<ComputationId>,
}

impl ReactiveContext {
    /// Enter a frame that attributes reads to `observer`.
    pub fn enter(observer: ComputationId) -> Self {
        Self::push(Some(observer))
    }

    /// Enter a frame in which reads are not attributed to any computation.
    pub fn untracked() -> Self {
        Self::push(None)
    }

    /// Enter a frame that keeps the current observer but records reads
    /// separately. Used by memos.
    pub(crate) fn recording() -> Self {
        Self::push(Self::current_observer())
    }

    fn push(observer: Option<ComputationId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                observer,
                dependencies: Vec::new(),
            });
        });

        Self { observer }
    }

    /// Check if reads are currently attributed to a computation.
    pub fn is_active() -> bool {
        Self::current_observer().is_some()
    }

    /// The computation reads are currently attributed to.
    pub fn current_observer() -> Option<ComputationId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.observer))
    }

    /// Record a dependency in the top frame.
    pub(crate) fn record(dep: &Dep) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if !entry.dependencies.contains(dep) {
                    entry.dependencies.push(dep.clone());
                }
            }
        });
    }

    /// The dependencies recorded in the top frame.
    pub fn dependencies() -> Vec<Dep> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.clone())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.observer, self.observer,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.observer, entry.observer
                );
            }
        });
    }
}

/// Run `f` without attributing its reads to the current computation.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::untracked();
    f()
}
