//! Renderable children.
//!
//! A reactive expression produces a [`Child`]. Before anything touches the
//! output tree the result is flattened and classified once into a
//! [`Resolved`] shape that picks the reconciliation strategy.

use std::fmt;
use std::rc::Rc;

use super::host::{Host, NodeRef};
use crate::error::{Error, Result};
use crate::instance::Component;
use crate::reactive::untrack;
use crate::store::Value;

/// Identity of an item in a keyed list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Int(i64),
}

impl Key {
    /// Key for a store value: strings and integral numbers only.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Str(s) => Some(Key::Str(s.clone())),
            other => other.as_i64().map(Key::Int),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => f.write_str(s),
            Key::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(Rc::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(Rc::from(s))
    }
}

impl From<Rc<str>> for Key {
    fn from(s: Rc<str>) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Int(n.into())
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Key::Int(n.into())
    }
}

pub(crate) enum KeyedBuild {
    Node(NodeRef),
    Component(Component),
    Lazy(Box<dyn FnOnce() -> Child>),
}

/// A child carrying a key.
///
/// A lazy keyed child is only built if its key was not rendered before, and
/// the builder runs untracked.
pub struct Keyed {
    pub(crate) key: Key,
    pub(crate) build: KeyedBuild,
}

impl Keyed {
    /// A keyed plain node. Plain nodes own no instance.
    pub fn node(key: impl Into<Key>, node: NodeRef) -> Self {
        Self {
            key: key.into(),
            build: KeyedBuild::Node(node),
        }
    }

    /// A keyed, already-rendered component. If the key is reused the
    /// component is disposed and the previous one kept.
    pub fn component(key: impl Into<Key>, component: Component) -> Self {
        Self {
            key: key.into(),
            build: KeyedBuild::Component(component),
        }
    }

    /// A keyed child built on first appearance of its key.
    pub fn lazy<C: Into<Child>>(key: impl Into<Key>, build: impl FnOnce() -> C + 'static) -> Self {
        Self {
            key: key.into(),
            build: KeyedBuild::Lazy(Box::new(move || build().into())),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }
}

impl fmt::Debug for Keyed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let build = match &self.build {
            KeyedBuild::Node(node) => format!("node {node}"),
            KeyedBuild::Component(component) => format!("component {}", component.id()),
            KeyedBuild::Lazy(_) => "lazy".to_owned(),
        };
        f.debug_struct("Keyed")
            .field("key", &self.key)
            .field("build", &build)
            .finish()
    }
}

/// The result of a render or reactive expression.
#[derive(Debug, Default)]
pub enum Child {
    #[default]
    Empty,
    Text(String),
    Node(NodeRef),
    Component(Component),
    Keyed(Keyed),
    List(Vec<Child>),
}

impl Child {
    pub fn text(text: impl Into<String>) -> Self {
        Child::Text(text.into())
    }

    /// Shorthand for [`Keyed::lazy`].
    pub fn keyed<C: Into<Child>>(key: impl Into<Key>, build: impl FnOnce() -> C + 'static) -> Self {
        Child::Keyed(Keyed::lazy(key, build))
    }

    /// A keyed list from `items`, each keyed by `key_of` and built lazily
    /// by `render`.
    pub fn keyed_list<T, K, C>(
        items: impl IntoIterator<Item = T>,
        key_of: impl Fn(&T) -> K,
        render: impl Fn(T) -> C + Clone + 'static,
    ) -> Self
    where
        T: 'static,
        K: Into<Key>,
        C: Into<Child>,
    {
        Child::List(
            items
                .into_iter()
                .map(|item| {
                    let key = key_of(&item);
                    let render = render.clone();
                    Child::keyed(key, move || render(item))
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Child::Empty)
    }

    /// Build every node this child describes, in order.
    ///
    /// Lazy keyed children are built immediately, untracked.
    pub fn into_nodes(self, host: &dyn Host) -> Vec<NodeRef> {
        let mut nodes = Vec::new();
        self.collect_nodes(host, &mut nodes);
        nodes
    }

    fn collect_nodes(self, host: &dyn Host, out: &mut Vec<NodeRef>) {
        match self {
            Child::Empty => {}
            Child::Text(text) => out.push(host.create_text(&text)),
            Child::Node(node) => out.push(node),
            Child::Component(component) => out.extend(component.roots()),
            Child::Keyed(keyed) => match keyed.build {
                KeyedBuild::Node(node) => out.push(node),
                KeyedBuild::Component(component) => out.extend(component.roots()),
                KeyedBuild::Lazy(build) => untrack(build).collect_nodes(host, out),
            },
            Child::List(children) => {
                for child in children {
                    child.collect_nodes(host, out);
                }
            }
        }
    }

    /// Flatten and classify.
    pub(crate) fn resolve(self) -> Result<Resolved> {
        let children = match self {
            Child::Empty => return Ok(Resolved::Empty),
            Child::List(children) => children,
            Child::Text(text) => return Ok(Resolved::Single(Item::Text(text))),
            Child::Node(node) => return Ok(Resolved::Single(Item::Node(node))),
            Child::Component(component) => return Ok(Resolved::Single(Item::Component(component))),
            Child::Keyed(keyed) => return Ok(Resolved::Single(Item::Keyed(keyed))),
        };

        let mut items = Vec::new();
        flatten(children, &mut items);

        if items.is_empty() {
            return Ok(Resolved::Empty);
        }

        let keyed = items.iter().filter(|item| matches!(item, Item::Keyed(_))).count();
        if keyed == items.len() {
            let keyed = items
                .into_iter()
                .filter_map(|item| match item {
                    Item::Keyed(keyed) => Some(keyed),
                    _ => None,
                })
                .collect();
            Ok(Resolved::Keyed(keyed))
        } else if keyed == 0 {
            Ok(Resolved::Plain(items))
        } else {
            Err(Error::MixedKeyedChildren)
        }
    }
}

fn flatten(children: Vec<Child>, out: &mut Vec<Item>) {
    for child in children {
        match child {
            Child::Empty => {}
            Child::Text(text) => out.push(Item::Text(text)),
            Child::Node(node) => out.push(Item::Node(node)),
            Child::Component(component) => out.push(Item::Component(component)),
            Child::Keyed(keyed) => out.push(Item::Keyed(keyed)),
            Child::List(nested) => flatten(nested, out),
        }
    }
}

/// One renderable item after flattening.
#[derive(Debug)]
pub(crate) enum Item {
    Text(String),
    Node(NodeRef),
    Component(Component),
    Keyed(Keyed),
}

/// A flattened expression result.
#[derive(Debug)]
pub(crate) enum Resolved {
    Empty,
    Single(Item),
    Plain(Vec<Item>),
    Keyed(Vec<Keyed>),
}

// ----------------------------------------------------------------------------
// Conversions
// ----------------------------------------------------------------------------

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_owned())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<NodeRef> for Child {
    fn from(node: NodeRef) -> Self {
        Child::Node(node)
    }
}

impl From<Component> for Child {
    fn from(component: Component) -> Self {
        Child::Component(component)
    }
}

impl From<Keyed> for Child {
    fn from(keyed: Keyed) -> Self {
        Child::Keyed(keyed)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(children: Vec<T>) -> Self {
        Child::List(children.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(child: Option<T>) -> Self {
        child.map(Into::into).unwrap_or_default()
    }
}

/// `null` and `false` render nothing, lists render element-wise (tracking
/// the list), everything else renders as text.
impl From<Value> for Child {
    fn from(value: Value) -> Self {
        if value.is_falsy_child() {
            return Child::Empty;
        }
        match value {
            Value::List(list) => Child::List(list.to_vec().into_iter().map(Child::from).collect()),
            other => Child::Text(other.to_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemoryTree;

    #[test]
    fn falsy_values_are_dropped() {
        let child = Child::from(vec![
            Child::from(Value::Null),
            Child::from(Value::Bool(false)),
            Child::List(vec![Child::Empty]),
        ]);
        assert!(matches!(child.resolve(), Ok(Resolved::Empty)));
    }

    #[test]
    fn nested_lists_flatten_in_order() {
        let child = Child::from(vec![
            Child::text("a"),
            Child::List(vec![Child::text("b"), Child::List(vec![Child::text("c")])]),
        ]);
        match child.resolve() {
            Ok(Resolved::Plain(items)) => assert_eq!(items.len(), 3),
            other => panic!("expected plain items, got {other:?}"),
        }
    }

    #[test]
    fn single_list_element_is_still_a_list() {
        let child = Child::from(vec![Child::keyed("a", || "a")]);
        assert!(matches!(child.resolve(), Ok(Resolved::Keyed(items)) if items.len() == 1));
    }

    #[test]
    fn mixing_keyed_and_plain_fails() {
        let child = Child::from(vec![Child::keyed("a", || "a"), Child::text("b")]);
        let err = child.resolve().unwrap_err();
        assert!(err
            .to_string()
            .contains("Cannot mix keyed and non-keyed children in the same array"));
    }

    #[test]
    fn keys_from_values() {
        assert_eq!(Key::from_value(&Value::from("x")), Some(Key::from("x")));
        assert_eq!(Key::from_value(&Value::from(3)), Some(Key::Int(3)));
        assert_eq!(Key::from_value(&Value::from(1.5)), None);
        assert_ne!(Key::from("1"), Key::Int(1));
    }

    #[test]
    fn into_nodes_builds_lazies() {
        let tree = MemoryTree::new();
        let nodes = Child::from(vec![Child::text("a"), Child::keyed(1, || "b")]).into_nodes(&tree);
        assert_eq!(nodes.len(), 2);
        assert_eq!(tree.text(nodes[1]).as_deref(), Some("b"));
    }
}
