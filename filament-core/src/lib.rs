//! Filament Core
//!
//! This crate provides the core runtime for the Filament fine-grained
//! reactive UI framework. It implements:
//!
//! - Observable stores (maps and lists) with per-property dependency tracking
//! - A computation engine with batching and per-cycle memoization
//! - An instance tree that owns disposal of components and reactive content
//! - Region reconciliation, including the keyed list diff
//! - Async resources layered on top of the synchronous engine
//!
//! Component functions run once. Each reactive expression embedded in their
//! output gets its own computation, and only that expression re-runs when
//! the state it read changes.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: the property-to-computation listener index and notify queue
//! - `reactive`: computations, batching, memoization, triggers
//! - `store`: observable containers and their values
//! - `render`: the host interface, regions and renderable children
//! - `instance`: components, reactive content, scopes and hooks
//! - `resource`: async values and boundaries
//!
//! The engine is single-threaded. All of its state is thread-local.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use filament_core::prelude::*;
//!
//! let tree = Rc::new(MemoryTree::new());
//! let body = tree.create_element("body");
//! let store = StoreMap::from_entries([("count", 0)]);
//!
//! let app = {
//!     let (tree, store) = (tree.clone(), store.clone());
//!     mount(tree.clone(), body, move || {
//!         let p = tree.create_element("p");
//!         insert_reactive(p, move || store.get("count")).unwrap();
//!         p
//!     })
//! };
//!
//! store.set("count", 5);
//! assert_eq!(tree.inner(body), "<p>5</p>");
//! app.dispose();
//! ```

pub mod error;
pub mod config;
pub mod graph;
pub mod reactive;
pub mod store;
pub mod render;
pub mod instance;
pub mod resource;

pub use config::{config, configure, Config};
pub use error::{Error, Result};

/// Commonly used items.
pub mod prelude {
    pub use crate::instance::{
        component, create_effect, enter_component_scope, enter_reactive_scope, enter_root_scope,
        get_current_component, get_current_instance, insert_reactive, mount, on_cleanup, on_mount,
        provide_context, use_context, Component, Instance, ReactiveContent,
    };
    pub use crate::reactive::{autorun, batch, memoize, untrack, Disposer, Memo, OnCleanup};
    pub use crate::render::{create_region, Child, Host, Key, Keyed, MemoryTree, NodeRef, Region};
    pub use crate::resource::{provide_boundary, Boundary, Resource, ResourceState};
    pub use crate::store::{create_store, from_serialize, StoreList, StoreMap, Value};
}
