//! Anchored output regions.
//!
//! A [`Region`] is the span between two marker nodes inside one parent. The
//! markers are inserted once and never move; content is only ever placed
//! between them.
//!
//! The region is a node remover and nothing else. Cleanups registered with
//! [`Region::add_cleanup`] are collected here but run by the reactive content
//! that owns the region.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{trace, warn};

use super::host::{Host, NodeRef};

type Cleanup = Box<dyn FnOnce()>;

// ----------------------------------------------------------------------------
// Node chain
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<NodeRef>,
    next: Option<NodeRef>,
}

/// The ordered content of a region, linked through a node map so moves,
/// removals and neighbour lookups never scan.
#[derive(Debug, Default)]
struct Chain {
    links: HashMap<NodeRef, Link>,
    first: Option<NodeRef>,
    last: Option<NodeRef>,
}

impl Chain {
    fn len(&self) -> usize {
        self.links.len()
    }

    fn contains(&self, node: NodeRef) -> bool {
        self.links.contains_key(&node)
    }

    fn prev(&self, node: NodeRef) -> Option<NodeRef> {
        self.links.get(&node).and_then(|link| link.prev)
    }

    fn unlink(&mut self, node: NodeRef) -> bool {
        let Some(link) = self.links.remove(&node) else {
            return false;
        };
        match link.prev {
            Some(prev) => self.set_next(prev, link.next),
            None => self.first = link.next,
        }
        match link.next {
            Some(next) => self.set_prev(next, link.prev),
            None => self.last = link.prev,
        }
        true
    }

    /// Link `node` before `reference`, which must be in the chain, or at the
    /// end when `None`. `node` must not be in the chain.
    fn link_before(&mut self, node: NodeRef, reference: Option<NodeRef>) {
        let prev = match reference {
            Some(reference) => self.prev(reference),
            None => self.last,
        };
        self.links.insert(
            node,
            Link {
                prev,
                next: reference,
            },
        );
        match prev {
            Some(prev) => self.set_next(prev, Some(node)),
            None => self.first = Some(node),
        }
        match reference {
            Some(reference) => self.set_prev(reference, Some(node)),
            None => self.last = Some(node),
        }
    }

    fn set_next(&mut self, node: NodeRef, next: Option<NodeRef>) {
        if let Some(link) = self.links.get_mut(&node) {
            link.next = next;
        }
    }

    fn set_prev(&mut self, node: NodeRef, prev: Option<NodeRef>) {
        if let Some(link) = self.links.get_mut(&node) {
            link.prev = prev;
        }
    }

    fn to_vec(&self) -> Vec<NodeRef> {
        let mut nodes = Vec::with_capacity(self.len());
        let mut cursor = self.first;
        while let Some(node) = cursor {
            nodes.push(node);
            cursor = self.links.get(&node).and_then(|link| link.next);
        }
        nodes
    }
}

// ----------------------------------------------------------------------------
// Region
// ----------------------------------------------------------------------------

struct RegionInner {
    host: Rc<dyn Host>,
    parent: NodeRef,
    start: NodeRef,
    end: NodeRef,
    content: RefCell<Chain>,
    cleanups: RefCell<SmallVec<[Cleanup; 2]>>,
}

/// A bounded span of the output tree.
#[derive(Clone)]
pub struct Region(Rc<RegionInner>);

impl Region {
    /// Create a region at the end of `parent`.
    pub fn new(host: Rc<dyn Host>, parent: NodeRef) -> Self {
        Self::before(host, parent, None)
    }

    /// Create a region inside `parent`, placed before `reference`.
    pub fn before(host: Rc<dyn Host>, parent: NodeRef, reference: Option<NodeRef>) -> Self {
        let start = host.create_marker("region-start");
        let end = host.create_marker("region-end");
        host.insert_before(parent, start, reference);
        host.insert_before(parent, end, reference);

        Self(Rc::new(RegionInner {
            host,
            parent,
            start,
            end,
            content: RefCell::new(Chain::default()),
            cleanups: RefCell::new(SmallVec::new()),
        }))
    }

    pub fn host(&self) -> &Rc<dyn Host> {
        &self.0.host
    }

    pub fn parent(&self) -> NodeRef {
        self.0.parent
    }

    pub fn start(&self) -> NodeRef {
        self.0.start
    }

    pub fn end(&self) -> NodeRef {
        self.0.end
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The nodes between the anchors, in order.
    pub fn nodes(&self) -> Vec<NodeRef> {
        self.0.content.borrow().to_vec()
    }

    pub fn len(&self) -> usize {
        self.0.content.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.0.content.borrow().contains(node)
    }

    /// Insert `node` before `reference`, or before the end anchor when
    /// `reference` is `None`.
    ///
    /// A node already in the region is moved. A reference that is not in the
    /// region falls back to the end anchor.
    pub fn insert_before(&self, node: NodeRef, reference: Option<NodeRef>) {
        if node == self.0.start || node == self.0.end || Some(node) == reference {
            return;
        }

        let mut content = self.0.content.borrow_mut();
        content.unlink(node);

        let at = match reference {
            None => None,
            Some(reference) if reference == self.0.end => None,
            Some(reference) if content.contains(reference) => Some(reference),
            Some(reference) => {
                warn!(%node, %reference, "reference node is not inside the region; inserting at the end");
                None
            }
        };
        content.link_before(node, at);
        drop(content);

        let anchor = at.unwrap_or(self.0.end);
        trace!(%node, %anchor, "region insert");
        self.0.host.insert_before(self.0.parent, node, Some(anchor));
    }

    /// Remove one node from the region.
    pub fn remove(&self, node: NodeRef) {
        let removed = self.0.content.borrow_mut().unlink(node);
        if removed {
            self.0.host.remove(self.0.parent, node);
        }
    }

    /// Remove every node between the anchors. Cleanups are left alone.
    pub fn clear(&self) {
        let content = std::mem::take(&mut *self.0.content.borrow_mut());
        for node in content.to_vec() {
            self.0.host.remove(self.0.parent, node);
        }
    }

    /// Whether `nodes` sit contiguously, in order, directly before
    /// `reference` (the end anchor when `None`).
    pub fn is_placed_before(&self, nodes: &[NodeRef], reference: Option<NodeRef>) -> bool {
        let content = self.0.content.borrow();
        let mut cursor = match reference {
            None => content.last,
            Some(reference) if reference == self.0.end => content.last,
            Some(reference) if content.contains(reference) => content.prev(reference),
            Some(_) => return false,
        };
        for node in nodes.iter().rev() {
            if cursor != Some(*node) {
                return false;
            }
            cursor = content.prev(*node);
        }
        true
    }

    /// Register a cleanup for content rendered into this region.
    pub fn add_cleanup(&self, cleanup: impl FnOnce() + 'static) {
        self.0.cleanups.borrow_mut().push(Box::new(cleanup));
    }

    pub fn cleanup_count(&self) -> usize {
        self.0.cleanups.borrow().len()
    }

    /// Take every registered cleanup, leaving the list empty.
    pub(crate) fn take_cleanups(&self) -> SmallVec<[Cleanup; 2]> {
        std::mem::take(&mut *self.0.cleanups.borrow_mut())
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("parent", &self.0.parent)
            .field("start", &self.0.start)
            .field("end", &self.0.end)
            .field("content", &self.0.content.borrow().to_vec())
            .field("cleanups", &self.0.cleanups.borrow().len())
            .finish()
    }
}

/// Create a region at the end of `parent`.
pub fn create_region(host: Rc<dyn Host>, parent: NodeRef) -> Region {
    Region::new(host, parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemoryTree;

    fn setup() -> (Rc<MemoryTree>, NodeRef, Region) {
        let tree = Rc::new(MemoryTree::new());
        let root = tree.create_element("div");
        let region = create_region(tree.clone(), root);
        (tree, root, region)
    }

    #[test]
    fn content_stays_between_anchors() {
        let (tree, root, region) = setup();
        let before = tree.create_text("before");
        tree.insert_before(root, before, Some(region.start()));
        let after = tree.create_text("after");
        tree.append(root, after);

        let a = tree.create_text("a");
        let b = tree.create_text("b");
        region.insert_before(b, None);
        region.insert_before(a, Some(b));

        assert_eq!(tree.inner(root), "beforeabafter");
        let children = tree.children(root);
        assert_eq!(children[1], region.start());
        assert_eq!(children[4], region.end());
        assert_eq!(tree.marker_label(region.start()).as_deref(), Some("region-start"));
        assert_eq!(tree.marker_label(a), None);
    }

    #[test]
    fn clear_leaves_anchors_and_cleanups() {
        let (tree, root, region) = setup();
        region.insert_before(tree.create_text("x"), None);
        region.add_cleanup(|| {});

        region.clear();
        assert!(region.is_empty());
        assert_eq!(tree.children(root), vec![region.start(), region.end()]);
        assert_eq!(region.cleanup_count(), 1);
        assert_eq!(region.take_cleanups().len(), 1);
        assert_eq!(region.cleanup_count(), 0);
    }

    #[test]
    fn unknown_reference_falls_back_to_end() {
        let (tree, root, region) = setup();
        let a = tree.create_text("a");
        let stray = tree.create_text("stray");
        region.insert_before(a, Some(stray));

        assert_eq!(region.nodes(), vec![a]);
        assert_eq!(tree.inner(root), "a");
    }

    #[test]
    fn placement_check() {
        let (tree, _root, region) = setup();
        let a = tree.create_text("a");
        let b = tree.create_text("b");
        region.insert_before(a, None);
        region.insert_before(b, None);

        assert!(region.is_placed_before(&[b], None));
        assert!(region.is_placed_before(&[a], Some(b)));
        assert!(region.is_placed_before(&[a, b], Some(region.end())));
        assert!(!region.is_placed_before(&[b], Some(a)));
    }

    #[test]
    fn moves_keep_the_chain_in_sync_with_the_host() {
        let (tree, root, region) = setup();
        let nodes: Vec<NodeRef> = ["a", "b", "c", "d"]
            .iter()
            .map(|text| tree.create_text(text))
            .collect();
        for node in &nodes {
            region.insert_before(*node, None);
        }

        // d to the front, b to the back, c removed
        region.insert_before(nodes[3], Some(nodes[0]));
        region.insert_before(nodes[1], None);
        region.remove(nodes[2]);

        assert_eq!(region.nodes(), vec![nodes[3], nodes[0], nodes[1]]);
        assert_eq!(tree.inner(root), "dab");
        assert_eq!(region.len(), 3);
        assert!(!region.contains(nodes[2]));
        assert!(region.is_placed_before(&[nodes[3], nodes[0]], Some(nodes[1])));
        assert!(!region.is_placed_before(&[nodes[0], nodes[3]], Some(nodes[1])));
        assert!(!region.is_placed_before(&[nodes[1]], Some(nodes[2])));
    }
}
