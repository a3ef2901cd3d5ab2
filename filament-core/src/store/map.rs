//! Observable maps.
//!
//! Fields are kept in insertion order. Reading a field inside a computation
//! subscribes it to that field; listing the keys subscribes it to the key set.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::Value;
use crate::graph::{Dep, ObjectId, PropKey};
use crate::reactive::{batch, Runtime};

struct MapNode {
    id: ObjectId,
    entries: RefCell<IndexMap<Rc<str>, Value>>,
}

/// A string-keyed observable mapping.
///
/// Cloning the handle does not copy the data; both handles observe and
/// mutate the same map, and compare equal with [`StoreMap::ptr_eq`].
#[derive(Clone)]
pub struct StoreMap(Rc<MapNode>);

impl StoreMap {
    pub fn new() -> Self {
        Self(Rc::new(MapNode {
            id: ObjectId::new(),
            entries: RefCell::new(IndexMap::new()),
        }))
    }

    /// Build a map from `(key, value)` pairs without notifying anyone.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let map = Self::new();
        for (key, value) in entries {
            map.insert_untracked(key.as_ref(), value.into());
        }
        map
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Whether both handles refer to the same map.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn track(&self, key: PropKey) {
        Runtime::track(Dep::new(self.0.id, key));
    }

    fn notify(&self, key: PropKey) {
        Runtime::notify(Dep::new(self.0.id, key));
    }

    /// Read a field, tracking it. Missing fields read as [`Value::Null`].
    pub fn get(&self, key: &str) -> Value {
        self.track(PropKey::field(key));
        self.peek(key)
    }

    /// Read a field without tracking it.
    pub fn peek(&self, key: &str) -> Value {
        self.0.entries.borrow().get(key).cloned().unwrap_or_default()
    }

    /// Whether the field exists, tracking it.
    pub fn contains_key(&self, key: &str) -> bool {
        self.track(PropKey::field(key));
        self.0.entries.borrow().contains_key(key)
    }

    /// Write a field.
    ///
    /// Nothing is notified if the new value is strictly equal to the old
    /// one. Adding a field also notifies the key set.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();

        let (replaced, added) = {
            let mut entries = self.0.entries.borrow_mut();
            match entries.get_mut(key) {
                Some(current) if *current == value => return,
                Some(current) => (Some(std::mem::replace(current, value)), false),
                None => {
                    entries.insert(Rc::from(key), value);
                    (None, true)
                }
            }
        };
        drop(replaced);

        if added {
            batch(|| {
                self.notify(PropKey::field(key));
                self.notify(PropKey::Keys);
            });
        } else {
            self.notify(PropKey::field(key));
        }
    }

    /// Read-modify-write a field.
    pub fn update(&self, key: &str, f: impl FnOnce(Value) -> Value) {
        let next = f(self.peek(key));
        self.set(key, next);
    }

    /// Remove a field, returning its value.
    ///
    /// Always notifies, even if the field did not exist.
    pub fn delete(&self, key: &str) -> Value {
        let removed = self.0.entries.borrow_mut().shift_remove(key);
        batch(|| {
            self.notify(PropKey::field(key));
            self.notify(PropKey::Keys);
        });
        removed.unwrap_or_default()
    }

    /// The field names, tracking the key set.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.track(PropKey::Keys);
        self.0.entries.borrow().keys().cloned().collect()
    }

    /// Number of fields, tracking the key set.
    pub fn len(&self) -> usize {
        self.track(PropKey::Keys);
        self.0.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every field, tracking the key set and each field.
    pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
        self.track(PropKey::Keys);
        let entries = self.peek_entries();
        for (key, _) in &entries {
            self.track(PropKey::Field(key.clone()));
        }
        entries
    }

    /// Every field, untracked.
    pub fn peek_entries(&self) -> Vec<(Rc<str>, Value)> {
        self.0
            .entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub(crate) fn insert_untracked(&self, key: &str, value: Value) {
        self.0.entries.borrow_mut().insert(Rc::from(key), value);
    }
}

impl Default for StoreMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for StoreMap {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for StoreMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreMap")
            .field("id", &self.0.id)
            .field("len", &self.0.entries.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::autorun;
    use std::cell::Cell;

    fn watch(map: &StoreMap, read: impl Fn(&StoreMap) + 'static) -> (Rc<Cell<usize>>, crate::reactive::Disposer) {
        let runs = Rc::new(Cell::new(0));
        let (map, runs2) = (map.clone(), runs.clone());
        let disposer = autorun(move |_| {
            read(&map);
            runs2.set(runs2.get() + 1);
        });
        (runs, disposer)
    }

    #[test]
    fn nested_reads_are_identity_stable() {
        let map = StoreMap::new();
        map.set("child", StoreMap::new());

        let a = map.get("child");
        let b = map.get("child");
        assert!(a.as_map().unwrap().ptr_eq(b.as_map().unwrap()));
    }

    #[test]
    fn set_same_value_does_not_notify() {
        let map = StoreMap::from_entries([("count", 0)]);
        let (runs, disposer) = watch(&map, |m| {
            m.get("count");
        });

        map.set("count", 5);
        map.set("count", 5);
        assert_eq!(runs.get(), 2);
        disposer.dispose();
    }

    #[test]
    fn new_container_always_notifies() {
        let map = StoreMap::from_entries([("items", Value::from(Vec::<i32>::new()))]);
        let (runs, disposer) = watch(&map, |m| {
            m.get("items");
        });

        map.set("items", Vec::<i32>::new());
        assert_eq!(runs.get(), 2);
        disposer.dispose();
    }

    #[test]
    fn delete_always_notifies() {
        let map = StoreMap::new();
        let (runs, disposer) = watch(&map, |m| {
            m.get("missing");
        });

        assert!(map.delete("missing").is_null());
        assert_eq!(runs.get(), 2);
        disposer.dispose();
    }

    #[test]
    fn adding_a_key_notifies_key_readers_once() {
        let map = StoreMap::new();
        let (runs, disposer) = watch(&map, |m| {
            m.keys();
            m.get("a");
        });

        map.set("a", 1);
        assert_eq!(runs.get(), 2);
        assert_eq!(map.peek_entries().len(), 1);
        disposer.dispose();
    }

    #[test]
    fn update_reads_untracked() {
        let map = StoreMap::from_entries([("n", 1)]);
        map.update("n", |v| Value::from(v.as_f64().unwrap_or(0.0) + 1.0));
        assert_eq!(map.peek("n").as_i64(), Some(2));
    }
}
