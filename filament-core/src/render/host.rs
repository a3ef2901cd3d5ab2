//! The presentation-tree interface.

use std::fmt;

/// Opaque handle to a node in the host's output tree.
///
/// Handles compare by identity: two handles are equal only if they name the
/// same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub u64);

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// The minimal output-tree capability the runtime needs.
///
/// Methods take `&self`; hosts are shared behind `Rc<dyn Host>` by every
/// instance and region, so implementations use interior mutability.
pub trait Host {
    /// Create a detached text node.
    fn create_text(&self, text: &str) -> NodeRef;

    /// Create a detached boundary marker. `label` is for debugging only.
    fn create_marker(&self, label: &str) -> NodeRef;

    /// Insert `node` into `parent` before `reference`, or at the end when
    /// `reference` is `None`. A node that already has a parent is moved.
    fn insert_before(&self, parent: NodeRef, node: NodeRef, reference: Option<NodeRef>);

    /// Detach `node` from `parent`. Does nothing if `node` is not a child of
    /// `parent`.
    fn remove(&self, parent: NodeRef, node: NodeRef);

    /// The current parent of `node`, if it is attached.
    fn parent_of(&self, node: NodeRef) -> Option<NodeRef>;
}
