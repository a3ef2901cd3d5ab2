//! Async Content
//!
//! Asynchronous values layered on top of the synchronous engine. A
//! [`Resource`] is a small state machine that moves from `Idle` to `Pending`
//! to `Resolved` or `Rejected`. Its state is observable, so a reactive
//! expression that reads it re-renders when a load settles.
//!
//! Loads run on the current `tokio` [`LocalSet`](tokio::task::LocalSet).
//! Nothing is ever aborted: a settled load applies its result only if it is
//! still the latest load and the resource has not been cancelled.
//!
//! # Boundaries
//!
//! A [`Boundary`] provided by a component aggregates the loads of every
//! resource created beneath it: how many are pending, and which failed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::instance::{get_current_component, provide_context, use_context};
use crate::reactive::Trigger;

/// Where a resource is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState<T> {
    Idle,
    Pending,
    Resolved(T),
    Rejected(String),
}

impl<T> ResourceState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, ResourceState::Pending)
    }
}

struct ResourceInner<T> {
    state: RefCell<ResourceState<T>>,
    trigger: Trigger,
    generation: Cell<u64>,
    cancelled: Cell<bool>,
    counted: Cell<bool>,
    boundary: Option<Boundary>,
}

/// An observable asynchronous value.
pub struct Resource<T> {
    inner: Rc<ResourceInner<T>>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Resource<T> {
    /// Create an idle resource.
    ///
    /// Created inside a component, the resource reports to the nearest
    /// boundary and is cancelled when the component is disposed.
    pub fn new() -> Self {
        let resource = Self {
            inner: Rc::new(ResourceInner {
                state: RefCell::new(ResourceState::Idle),
                trigger: Trigger::new(),
                generation: Cell::new(0),
                cancelled: Cell::new(false),
                counted: Cell::new(false),
                boundary: nearest_boundary(),
            }),
        };

        if let Some(owner) = get_current_component() {
            let weak = Rc::downgrade(&resource.inner);
            owner.add_cleanup(move || {
                if let Some(inner) = weak.upgrade() {
                    Resource { inner }.cancel();
                }
            });
        }
        resource
    }

    /// The current state, tracked.
    pub fn state(&self) -> ResourceState<T> {
        self.inner.trigger.track();
        self.peek()
    }

    /// The current state, untracked.
    pub fn peek(&self) -> ResourceState<T> {
        self.inner.state.borrow().clone()
    }

    /// The resolved value, tracked.
    pub fn value(&self) -> Option<T> {
        match self.state() {
            ResourceState::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state().is_pending()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }

    /// Start a load and return its task handle.
    ///
    /// A newer load supersedes an older one still in flight: only the latest
    /// result is applied.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `LocalSet`, like
    /// [`tokio::task::spawn_local`].
    pub fn load<F, E>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<T, E>> + 'static,
        E: fmt::Display + 'static,
    {
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);

        if !self.inner.cancelled.get() {
            if !self.inner.counted.replace(true) {
                if let Some(boundary) = &self.inner.boundary {
                    boundary.begin();
                }
            }
            self.set_state(ResourceState::Pending);
        }

        let weak: Weak<ResourceInner<T>> = Rc::downgrade(&self.inner);
        tokio::task::spawn_local(async move {
            let result = future.await.map_err(|err| err.to_string());
            if let Some(inner) = weak.upgrade() {
                Resource { inner }.settle(generation, result);
            }
        })
    }

    fn settle(&self, generation: u64, result: Result<T, String>) {
        if self.inner.cancelled.get() {
            debug!(generation, "resource cancelled; result dropped");
            return;
        }
        if generation != self.inner.generation.get() {
            debug!(generation, latest = self.inner.generation.get(), "stale resource result dropped");
            return;
        }

        let failure = result.as_ref().err().cloned();
        self.set_state(match result {
            Ok(value) => ResourceState::Resolved(value),
            Err(message) => ResourceState::Rejected(message),
        });

        if let Some(boundary) = &self.inner.boundary {
            if let Some(message) = failure {
                warn!(error = %message, "resource load failed");
                boundary.reject(message);
            }
            if self.inner.counted.replace(false) {
                boundary.end();
            }
        } else {
            self.inner.counted.set(false);
        }
    }

    /// Stop applying results. The current state is kept.
    pub fn cancel(&self) {
        if self.inner.cancelled.replace(true) {
            return;
        }
        if self.inner.counted.replace(false) {
            if let Some(boundary) = &self.inner.boundary {
                boundary.end();
            }
        }
    }

    fn set_state(&self, state: ResourceState<T>) {
        *self.inner.state.borrow_mut() = state;
        self.inner.trigger.notify();
    }
}

impl<T: Clone + 'static> Default for Resource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("state", &self.inner.state.borrow())
            .field("generation", &self.inner.generation.get())
            .field("cancelled", &self.inner.cancelled.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Boundary
// ----------------------------------------------------------------------------

#[derive(Default)]
struct BoundaryInner {
    pending: Cell<usize>,
    errors: RefCell<Vec<String>>,
    trigger: Trigger,
}

/// Aggregated pending and error state of the resources beneath a component.
#[derive(Clone, Default)]
pub struct Boundary {
    inner: Rc<BoundaryInner>,
}

impl Boundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loads in flight, tracked.
    pub fn pending(&self) -> usize {
        self.inner.trigger.track();
        self.inner.pending.get()
    }

    pub fn is_pending(&self) -> bool {
        self.pending() > 0
    }

    /// Messages of failed loads, tracked.
    pub fn errors(&self) -> Vec<String> {
        self.inner.trigger.track();
        self.inner.errors.borrow().clone()
    }

    pub fn clear_errors(&self) {
        self.inner.errors.borrow_mut().clear();
        self.inner.trigger.notify();
    }

    pub fn ptr_eq(&self, other: &Boundary) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn begin(&self) {
        self.inner.pending.set(self.inner.pending.get() + 1);
        self.inner.trigger.notify();
    }

    fn end(&self) {
        self.inner.pending.set(self.inner.pending.get().saturating_sub(1));
        self.inner.trigger.notify();
    }

    fn reject(&self, message: String) {
        self.inner.errors.borrow_mut().push(message);
        self.inner.trigger.notify();
    }
}

impl fmt::Debug for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Boundary")
            .field("pending", &self.inner.pending.get())
            .field("errors", &self.inner.errors.borrow().len())
            .finish()
    }
}

/// Attach a new boundary to the current component.
pub fn provide_boundary() -> Boundary {
    let boundary = Boundary::new();
    provide_context(boundary.clone());
    boundary
}

/// The boundary of the closest enclosing component that provides one.
pub fn nearest_boundary() -> Option<Boundary> {
    use_context::<Boundary>()
}
