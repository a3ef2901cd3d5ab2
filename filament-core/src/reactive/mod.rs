//! Reactive Primitives
//!
//! This module implements the computation engine: dependency tracking,
//! change propagation, batching and per-cycle memoization.
//!
//! # Concepts
//!
//! ## Computations
//!
//! A computation runs a closure and records every store property it reads.
//! When one of those properties is written with a different value, the
//! computation re-runs. [`autorun`] creates one and returns its [`Disposer`].
//!
//! ## Batches
//!
//! [`batch`] defers notifications until the outermost batch exits, then
//! delivers them in one pass so each affected computation re-runs once.
//!
//! ## Memos
//!
//! [`Memo`] and [`memoize`] cache a pure function's result until the next
//! notification flush.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local context stack to detect
//! dependencies. When a property is read, we check if a computation is
//! running and, if so, subscribe it.

mod subscriber;
mod context;
mod runtime;
mod effect;
mod memo;
mod trigger;

pub use subscriber::ComputationId;
pub use context::{untrack, ReactiveContext};
pub use runtime::{batch, Runtime};
pub use effect::{autorun, Disposer, OnCleanup};
pub use memo::{memoize, Memo};
pub use trigger::Trigger;
