//! Output Tree
//!
//! The runtime never talks to a concrete presentation tree. It goes through
//! the [`Host`] trait and treats nodes as opaque [`NodeRef`] handles.
//!
//! # Pieces
//!
//! - [`Host`]: create, insert, remove and inspect nodes
//! - [`Region`]: a span between two fixed markers, managed by one reactive
//!   content instance
//! - [`Child`]: what a render or reactive expression returns
//! - [`MemoryTree`]: an in-memory host

mod host;
mod memory;
mod region;
mod child;

pub use host::{Host, NodeRef};
pub use memory::{MemoryTree, TreeStats};
pub use region::{create_region, Region};
pub use child::{Child, Key, Keyed};
pub(crate) use child::{Item, KeyedBuild, Resolved};
