//! Memo Implementation
//!
//! A memo caches the result of a pure function for the duration of one
//! change cycle. It lets a single reactive expression be referenced from
//! several places in one render pass without recomputing it.
//!
//! # How Memos Work
//!
//! 1. The runtime keeps a change counter that is bumped once per
//!    notification flush. Writes deferred by a batch do not bump it until the
//!    batch flushes.
//!
//! 2. A memo stores `{value, change_id, deps}`. Reading it while the counter
//!    still equals `change_id` returns the cached value.
//!
//! 3. Otherwise the function runs again in a recording frame, and the result
//!    is cached together with the properties it read.
//!
//! 4. Every read, cached or not, replays the recorded properties into the
//!    current computation, so each reader depends on them.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::context::ReactiveContext;
use super::runtime::Runtime;
use crate::graph::Dep;

thread_local! {
    /// `memoize` slots, keyed by the address of the closure's allocation.
    static MEMOIZED: RefCell<HashMap<usize, Box<dyn Slot>>> = RefCell::new(HashMap::new());
}

/// A cached result and the change cycle it belongs to.
#[derive(Clone)]
struct Cached<T> {
    value: T,
    change_id: u64,
    deps: Vec<Dep>,
}

/// Compute `f` in a recording frame.
fn compute<T>(f: impl FnOnce() -> T) -> Cached<T> {
    let change_id = Runtime::change_id();
    let _ctx = ReactiveContext::recording();
    let value = f();
    Cached {
        value,
        change_id,
        deps: ReactiveContext::dependencies(),
    }
}

fn replay(deps: Vec<Dep>) {
    for dep in deps {
        Runtime::track(dep);
    }
}

/// A value cached until the next notification flush.
///
/// # Example
///
/// ```rust,ignore
/// let total = Memo::new(move || items.to_vec().len());
///
/// // Both reads in the same pass share one computation.
/// let a = total.get();
/// let b = total.get();
/// ```
pub struct Memo<T> {
    compute: Rc<dyn Fn() -> T>,
    cache: Rc<RefCell<Option<Cached<T>>>>,
}

impl<T> Memo<T>
where
    T: Clone + 'static,
{
    /// Create a memo. Nothing is computed until the first read.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            compute: Rc::new(compute),
            cache: Rc::new(RefCell::new(None)),
        }
    }

    /// Get the value, recomputing it if the change cycle moved on.
    pub fn get(&self) -> T {
        let now = Runtime::change_id();
        let hit = self
            .cache
            .borrow()
            .as_ref()
            .filter(|cached| cached.change_id == now)
            .map(|cached| (cached.value.clone(), cached.deps.clone()));

        if let Some((value, deps)) = hit {
            replay(deps);
            return value;
        }

        let cached = compute(|| (self.compute)());
        let value = cached.value.clone();
        let deps = cached.deps.clone();
        *self.cache.borrow_mut() = Some(cached);
        replay(deps);
        value
    }

    /// Drop the cached value so the next read recomputes.
    pub fn invalidate(&self) {
        self.cache.borrow_mut().take();
    }

    /// Whether a value is cached for the current change cycle.
    pub fn is_fresh(&self) -> bool {
        self.cache
            .borrow()
            .as_ref()
            .is_some_and(|cached| cached.change_id == Runtime::change_id())
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            compute: Rc::clone(&self.compute),
            cache: Rc::clone(&self.cache),
        }
    }
}

impl<T> fmt::Debug for Memo<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.cache.borrow();
        f.debug_struct("Memo")
            .field("value", &cache.as_ref().map(|cached| &cached.value))
            .field("change_id", &cache.as_ref().map(|cached| cached.change_id))
            .finish()
    }
}

/// A `memoize` entry. The weak handle keeps the closure's allocation from
/// being reused while the entry exists.
struct MemoSlot<F: ?Sized, T> {
    owner: Weak<F>,
    cached: Cached<T>,
}

trait Slot {
    fn is_live(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<F: ?Sized + 'static, T: 'static> Slot for MemoSlot<F, T> {
    fn is_live(&self) -> bool {
        self.owner.strong_count() > 0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn slot_key<F: ?Sized>(f: &Rc<F>) -> usize {
    Rc::as_ptr(f) as *const () as usize
}

/// Call `f` through a per-thread cache keyed by the closure instance.
///
/// Each `Rc` gets its own slot, so two closures built from the same literal
/// with different captures never share a value. Calls within one change
/// cycle return the cached value. A slot is released once its closure has
/// been dropped.
///
/// # Example
///
/// ```rust,ignore
/// let total = Rc::new(move || items.to_vec().len());
///
/// let a = memoize(&total);
/// let b = memoize(&total); // cached
/// ```
pub fn memoize<T, F>(f: &Rc<F>) -> T
where
    T: Clone + 'static,
    F: Fn() -> T + ?Sized + 'static,
{
    let key = slot_key(f);
    let now = Runtime::change_id();

    let hit = MEMOIZED.with(|cache| {
        cache
            .borrow()
            .get(&key)
            .and_then(|slot| slot.as_any().downcast_ref::<MemoSlot<F, T>>())
            .map(|slot| &slot.cached)
            .filter(|cached| cached.change_id == now)
            .map(|cached| (cached.value.clone(), cached.deps.clone()))
    });
    if let Some((value, deps)) = hit {
        replay(deps);
        return value;
    }

    let cached = compute(|| (**f)());
    let value = cached.value.clone();
    let deps = cached.deps.clone();
    MEMOIZED.with(|cache| {
        let mut cache = cache.borrow_mut();
        cache.retain(|_, slot| slot.is_live());
        cache.insert(
            key,
            Box::new(MemoSlot {
                owner: Rc::downgrade(f),
                cached,
            }),
        );
    });
    replay(deps);
    value
}

#[cfg(test)]
fn memoized_slots() -> usize {
    MEMOIZED.with(|cache| cache.borrow().len())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
