//! Observable lists.
//!
//! Element reads track their position and `len()` tracks the length. The
//! in-place mutators are intercepted: each one performs its mutation and then,
//! in a single implicit batch, notifies the mutator's own key, the length and
//! every tracked position the mutation may have shifted.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::Value;
use crate::graph::{Dep, ObjectId, PropKey};
use crate::reactive::{batch, Runtime};

struct ListNode {
    id: ObjectId,
    items: RefCell<Vec<Value>>,
}

/// An observable ordered sequence.
#[derive(Clone)]
pub struct StoreList(Rc<ListNode>);

/// Puts moved-out items back, also when the mutation unwinds.
struct TakenItems<'a> {
    items: Vec<Value>,
    cell: &'a RefCell<Vec<Value>>,
}

impl Drop for TakenItems<'_> {
    fn drop(&mut self) {
        *self.cell.borrow_mut() = std::mem::take(&mut self.items);
    }
}

impl StoreList {
    pub fn new() -> Self {
        Self::from_values(Vec::new())
    }

    pub fn from_values(items: Vec<Value>) -> Self {
        Self(Rc::new(ListNode {
            id: ObjectId::new(),
            items: RefCell::new(items),
        }))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Whether both handles refer to the same list.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn track(&self, key: PropKey) {
        Runtime::track(Dep::new(self.0.id, key));
    }

    fn notify(&self, key: PropKey) {
        Runtime::notify(Dep::new(self.0.id, key));
    }

    /// Read the element at `index`, tracking that position.
    pub fn get(&self, index: usize) -> Value {
        self.track(PropKey::Index(index));
        self.peek_at(index)
    }

    /// Read the element at `index` without tracking.
    pub fn peek_at(&self, index: usize) -> Value {
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    /// Length, tracking it.
    pub fn len(&self) -> usize {
        self.track(PropKey::Length);
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every element, tracking the length and each position.
    pub fn to_vec(&self) -> Vec<Value> {
        self.track(PropKey::Length);
        let items = self.peek_all();
        for index in 0..items.len() {
            self.track(PropKey::Index(index));
        }
        items
    }

    /// Every element, untracked.
    pub fn peek_all(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    /// Write one position.
    ///
    /// Writing past the end pads with [`Value::Null`] and also notifies the
    /// length.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let value = value.into();
        let (replaced, grew) = {
            let mut items = self.0.items.borrow_mut();
            if let Some(current) = items.get_mut(index) {
                if *current == value {
                    return;
                }
                (Some(std::mem::replace(current, value)), false)
            } else {
                items.resize(index, Value::Null);
                items.push(value);
                (None, true)
            }
        };
        drop(replaced);

        if grew {
            batch(|| {
                self.notify(PropKey::Index(index));
                self.notify(PropKey::Length);
            });
        } else {
            self.notify(PropKey::Index(index));
        }
    }

    /// Run an in-place mutation and notify its observers in one batch.
    ///
    /// `from` is the first position the mutation may have changed.
    fn mutate<R>(
        &self,
        method: &'static str,
        from: impl FnOnce(usize) -> usize,
        f: impl FnOnce(&mut Vec<Value>) -> R,
    ) -> R {
        // the vector is moved out so a comparator may read other stores freely
        let mut taken = TakenItems {
            items: std::mem::take(&mut *self.0.items.borrow_mut()),
            cell: &self.0.items,
        };
        let first_changed = from(taken.items.len());
        let result = f(&mut taken.items);
        drop(taken);

        let shifted: Vec<usize> = Runtime::tracked_indices(self.0.id)
            .into_iter()
            .filter(|index| *index >= first_changed)
            .collect();

        batch(|| {
            self.notify(PropKey::Method(method));
            self.notify(PropKey::Length);
            for index in shifted {
                self.notify(PropKey::Index(index));
            }
        });
        result
    }

    /// Append an element.
    pub fn push(&self, value: impl Into<Value>) {
        let value = value.into();
        self.mutate("push", |len| len, move |items| items.push(value));
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        self.mutate("pop", |len| len.saturating_sub(1), Vec::pop)
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        self.mutate(
            "shift",
            |_| 0,
            |items| (!items.is_empty()).then(|| items.remove(0)),
        )
    }

    /// Prepend an element.
    pub fn unshift(&self, value: impl Into<Value>) {
        let value = value.into();
        self.mutate("unshift", |_| 0, move |items| items.insert(0, value));
    }

    /// Insert an element at `index` (clamped to the length).
    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        let value = value.into();
        self.mutate(
            "insert",
            |len| index.min(len),
            move |items| {
                let at = index.min(items.len());
                items.insert(at, value);
            },
        );
    }

    /// Remove and return the element at `index`.
    pub fn remove(&self, index: usize) -> Option<Value> {
        self.mutate(
            "remove",
            |_| index,
            |items| (index < items.len()).then(|| items.remove(index)),
        )
    }

    /// Remove `delete_count` elements at `start` and insert `items` there.
    ///
    /// Returns the removed elements. Both bounds are clamped.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        self.mutate(
            "splice",
            |len| start.min(len),
            move |current| {
                let start = start.min(current.len());
                let end = start.saturating_add(delete_count).min(current.len());
                current.splice(start..end, items).collect()
            },
        )
    }

    /// Stable sort with a comparator.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) {
        self.mutate("sort", |_| 0, |items| items.sort_by(compare));
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.mutate("reverse", |_| 0, |items| items.reverse());
    }

    /// Remove every element.
    pub fn clear(&self) {
        self.mutate("clear", |_| 0, Vec::clear);
    }

    /// Keep only the elements matching `keep`.
    pub fn retain(&self, keep: impl FnMut(&Value) -> bool) {
        self.mutate("retain", |_| 0, |items| items.retain(keep));
    }
}

impl Default for StoreList {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for StoreList {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for StoreList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreList")
            .field("id", &self.0.id)
            .field("len", &self.0.items.borrow().len())
            .finish()
    }
}
