//! An in-memory presentation tree.
//!
//! [`MemoryTree`] is an arena of elements, text nodes and markers. It backs
//! the test suite and works as a headless host.

use std::cell::{Cell, RefCell};

use tracing::trace;

use super::host::{Host, NodeRef};

#[derive(Debug, Clone)]
enum NodeKind {
    Element(String),
    Text(String),
    Marker(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
}

/// Operation counters, for asserting how much work a render did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub created: usize,
    pub inserted: usize,
    pub removed: usize,
}

#[derive(Debug, Default)]
pub struct MemoryTree {
    nodes: RefCell<Vec<NodeData>>,
    created: Cell<usize>,
    inserted: Cell<usize>,
    removed: Cell<usize>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&self, kind: NodeKind) -> NodeRef {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeRef(nodes.len() as u64);
        nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.created.set(self.created.get() + 1);
        id
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeRef {
        self.alloc(NodeKind::Element(tag.to_owned()))
    }

    /// Append `node` to `parent`.
    pub fn append(&self, parent: NodeRef, node: NodeRef) {
        self.insert_before(parent, node, None);
    }

    /// Children of `node`, markers included.
    pub fn children(&self, node: NodeRef) -> Vec<NodeRef> {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    /// Children of `node` with markers filtered out.
    pub fn content(&self, node: NodeRef) -> Vec<NodeRef> {
        self.children(node)
            .into_iter()
            .filter(|child| !self.is_marker(*child))
            .collect()
    }

    pub fn is_marker(&self, node: NodeRef) -> bool {
        matches!(
            self.nodes.borrow().get(node.0 as usize).map(|data| &data.kind),
            Some(NodeKind::Marker(_))
        )
    }

    /// Text of a text node, or `None` for other kinds.
    pub fn text(&self, node: NodeRef) -> Option<String> {
        match self.nodes.borrow().get(node.0 as usize).map(|data| &data.kind) {
            Some(NodeKind::Text(text)) => Some(text.clone()),
            _ => None,
        }
    }

    /// Label a marker was created with, or `None` for other kinds.
    pub fn marker_label(&self, node: NodeRef) -> Option<String> {
        match self.nodes.borrow().get(node.0 as usize).map(|data| &data.kind) {
            Some(NodeKind::Marker(label)) => Some(label.clone()),
            _ => None,
        }
    }

    /// Replace the text of a text node.
    pub fn set_text(&self, node: NodeRef, text: &str) {
        if let Some(NodeData {
            kind: NodeKind::Text(current),
            ..
        }) = self.nodes.borrow_mut().get_mut(node.0 as usize)
        {
            *current = text.to_owned();
        }
    }

    /// Serialize a subtree. Elements render as `<tag>...</tag>`, markers
    /// render as nothing.
    pub fn render(&self, node: NodeRef) -> String {
        let mut out = String::new();
        self.render_into(&mut out, node);
        out
    }

    fn render_into(&self, out: &mut String, node: NodeRef) {
        let (kind, children) = match self.nodes.borrow().get(node.0 as usize) {
            Some(data) => (data.kind.clone(), data.children.clone()),
            None => return,
        };
        match kind {
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(&tag);
                out.push('>');
                for child in children {
                    self.render_into(out, child);
                }
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
            NodeKind::Text(text) => out.push_str(&text),
            NodeKind::Marker(_) => {}
        }
    }

    /// Serialized content of `node`, without the node's own tags.
    pub fn inner(&self, node: NodeRef) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.render_into(&mut out, child);
        }
        out
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            created: self.created.get(),
            inserted: self.inserted.get(),
            removed: self.removed.get(),
        }
    }

    pub fn reset_stats(&self) {
        self.created.set(0);
        self.inserted.set(0);
        self.removed.set(0);
    }

    fn detach(nodes: &mut [NodeData], node: NodeRef) {
        let Some(parent) = nodes[node.0 as usize].parent.take() else {
            return;
        };
        let siblings = &mut nodes[parent.0 as usize].children;
        if let Some(pos) = siblings.iter().position(|child| *child == node) {
            siblings.remove(pos);
        }
    }
}

impl Host for MemoryTree {
    fn create_text(&self, text: &str) -> NodeRef {
        self.alloc(NodeKind::Text(text.to_owned()))
    }

    fn create_marker(&self, label: &str) -> NodeRef {
        self.alloc(NodeKind::Marker(label.to_owned()))
    }

    fn insert_before(&self, parent: NodeRef, node: NodeRef, reference: Option<NodeRef>) {
        let mut nodes = self.nodes.borrow_mut();
        let len = nodes.len() as u64;
        if parent.0 >= len || node.0 >= len || parent == node {
            return;
        }

        Self::detach(&mut nodes, node);
        let siblings = &mut nodes[parent.0 as usize].children;
        let at = reference
            .and_then(|reference| siblings.iter().position(|child| *child == reference))
            .unwrap_or(siblings.len());
        siblings.insert(at, node);
        nodes[node.0 as usize].parent = Some(parent);

        trace!(%parent, %node, at, "memory tree insert");
        self.inserted.set(self.inserted.get() + 1);
    }

    fn remove(&self, parent: NodeRef, node: NodeRef) {
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get(node.0 as usize) {
            Some(data) if data.parent == Some(parent) => {}
            _ => return,
        }
        Self::detach(&mut nodes, node);
        self.removed.set(self.removed.get() + 1);
    }

    fn parent_of(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes.borrow().get(node.0 as usize).and_then(|data| data.parent)
    }
}
