//! Property listener index.
//!
//! Maps each observable object to its tracked properties, and each property
//! to the ordered set of computations that read it during their last run.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use super::node::{Dep, ObjectId, PropKey};
use crate::reactive::ComputationId;

/// The reverse index from `(object, property)` to computations.
#[derive(Debug, Default)]
pub(crate) struct ListenerIndex {
    by_object: HashMap<ObjectId, IndexMap<PropKey, IndexSet<ComputationId>>>,
}

impl ListenerIndex {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `computation` depends on `dep`.
    ///
    /// Returns `false` if the edge already existed.
    pub fn subscribe(&mut self, dep: &Dep, computation: ComputationId) -> bool {
        self.by_object
            .entry(dep.object)
            .or_default()
            .entry(dep.key.clone())
            .or_default()
            .insert(computation)
    }

    /// Remove one edge, pruning empty entries.
    pub fn unsubscribe(&mut self, dep: &Dep, computation: ComputationId) {
        let Some(keys) = self.by_object.get_mut(&dep.object) else {
            return;
        };
        if let Some(listeners) = keys.get_mut(&dep.key) {
            // shift_remove keeps the remaining listeners in subscription order
            listeners.shift_remove(&computation);
            if listeners.is_empty() {
                // property order carries no meaning
                keys.swap_remove(&dep.key);
            }
        }
        if keys.is_empty() {
            self.by_object.remove(&dep.object);
        }
    }

    /// The computations subscribed to `dep`, in subscription order.
    pub fn listeners(&self, dep: &Dep) -> SmallVec<[ComputationId; 4]> {
        self.by_object
            .get(&dep.object)
            .and_then(|keys| keys.get(&dep.key))
            .map(|listeners| listeners.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The list positions of `object` that currently have listeners.
    pub fn tracked_indices(&self, object: ObjectId) -> Vec<usize> {
        self.by_object
            .get(&object)
            .map(|keys| {
                keys.keys()
                    .filter_map(|key| match key {
                        PropKey::Index(index) => Some(*index),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total number of edges in the index.
    pub fn edge_count(&self) -> usize {
        self.by_object
            .values()
            .flat_map(|keys| keys.values())
            .map(IndexSet::len)
            .sum()
    }

    /// Number of objects that have at least one listener.
    #[cfg(test)]
    pub fn object_count(&self) -> usize {
        self.by_object.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_is_deduplicated() {
        let mut index = ListenerIndex::new();
        let dep = Dep::new(ObjectId::new(), PropKey::field("a"));
        let id = ComputationId::new();

        assert!(index.subscribe(&dep, id));
        assert!(!index.subscribe(&dep, id));
        assert_eq!(index.edge_count(), 1);
    }

    #[test]
    fn listeners_keep_subscription_order() {
        let mut index = ListenerIndex::new();
        let dep = Dep::new(ObjectId::new(), PropKey::field("a"));
        let ids: Vec<_> = (0..4).map(|_| ComputationId::new()).collect();

        for id in ids.iter().rev() {
            index.subscribe(&dep, *id);
        }
        index.unsubscribe(&dep, ids[2]);

        let expected: Vec<_> = vec![ids[3], ids[1], ids[0]];
        assert_eq!(index.listeners(&dep).to_vec(), expected);
    }

    #[test]
    fn unsubscribe_prunes_empty_entries() {
        let mut index = ListenerIndex::new();
        let object = ObjectId::new();
        let id = ComputationId::new();
        let a = Dep::new(object, PropKey::field("a"));
        let b = Dep::new(object, PropKey::Index(3));

        index.subscribe(&a, id);
        index.subscribe(&b, id);
        assert_eq!(index.tracked_indices(object), vec![3]);

        index.unsubscribe(&a, id);
        index.unsubscribe(&b, id);
        assert_eq!(index.edge_count(), 0);
        assert_eq!(index.object_count(), 0);
    }

    #[test]
    fn removing_a_property_keeps_its_siblings() {
        let mut index = ListenerIndex::new();
        let object = ObjectId::new();
        let id = ComputationId::new();
        let deps: Vec<_> = (0..3).map(|i| Dep::new(object, PropKey::Index(i))).collect();
        for dep in &deps {
            index.subscribe(dep, id);
        }

        index.unsubscribe(&deps[0], id);
        let mut tracked = index.tracked_indices(object);
        tracked.sort_unstable();
        assert_eq!(tracked, vec![1, 2]);
        assert_eq!(index.listeners(&deps[2]).to_vec(), vec![id]);
    }
}
