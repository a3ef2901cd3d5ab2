//! Graph Nodes
//!
//! The source side of the dependency graph: observable objects and the
//! property keys read from them.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an observable object (a store container or trigger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Generate a new unique object ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

/// A property of an observable object that a computation can depend on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropKey {
    /// A named field of a map.
    Field(Rc<str>),

    /// A position in a list.
    Index(usize),

    /// The length of a list.
    Length,

    /// The key set of a map.
    Keys,

    /// A list mutator, notified whenever that mutator runs.
    Method(&'static str),

    /// The single property of a bare trigger.
    Version,
}

impl PropKey {
    /// Shorthand for [`PropKey::Field`].
    pub fn field(name: &str) -> Self {
        Self::Field(Rc::from(name))
    }
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropKey::Field(name) => write!(f, "{name}"),
            PropKey::Index(index) => write!(f, "[{index}]"),
            PropKey::Length => f.write_str("length"),
            PropKey::Keys => f.write_str("keys"),
            PropKey::Method(name) => write!(f, "{name}()"),
            PropKey::Version => f.write_str("version"),
        }
    }
}

/// One edge source: a property of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dep {
    /// The object the property belongs to.
    pub object: ObjectId,
    /// The property.
    pub key: PropKey,
}

impl Dep {
    pub fn new(object: ObjectId, key: PropKey) -> Self {
        Self { object, key }
    }
}

impl fmt::Display for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.object.raw(), self.key)
    }
}
