//! Dependency Graph
//!
//! This module holds the bookkeeping that connects store properties to the
//! computations reading them.
//!
//! # Overview
//!
//! The graph is bipartite:
//!
//! - Sources are `(object, property)` pairs, written [`Dep`]. An object is any
//!   observable container (a store map or list, or a bare trigger).
//! - Sinks are computations, identified by [`ComputationId`](crate::reactive::ComputationId).
//!
//! The reverse index (source to sinks) lives in `ListenerIndex`; each
//! computation keeps the forward edges itself so it can unsubscribe on
//! disposal. Writes that happen inside a batch are parked in a `NotifyQueue`
//! until the outermost batch closes.
//!
//! # Design Decisions
//!
//! 1. Listener sets preserve insertion order, so listeners of one property run
//!    in the order they subscribed.
//!
//! 2. Entries are created on the first tracked read and pruned only when a
//!    computation unsubscribes. There is no background sweep.

mod node;
mod listeners;
mod scheduler;

pub use node::{Dep, ObjectId, PropKey};
pub(crate) use listeners::ListenerIndex;
pub(crate) use scheduler::NotifyQueue;
