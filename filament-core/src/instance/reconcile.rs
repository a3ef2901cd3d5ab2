//! Reconciliation.
//!
//! Applies a resolved expression result to the region of a reactive content.
//! Empty, single and plain-list results replace the region wholesale; keyed
//! lists go through the keyed diff, which reuses the nodes and instances of
//! every key that survives.
//!
//! # Keyed diff
//!
//! 1. Key the previous entries; unkeyed leftovers are removed.
//! 2. Keys that disappeared are disposed and their nodes removed.
//! 3. The new list is walked backwards from the end anchor. A surviving key
//!    is moved in front of the reference unless it already sits there; a new
//!    key is built now, inserted, and mounted.
//! 4. The children become exactly the instances of the new entries, in
//!    list order.
//!
//! If the key sequence did not change at all the diff is skipped.

use std::collections::HashSet;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::content::{ReactiveContent, RenderMode};
use super::{Component, Instance, InstanceId};
use crate::reactive::untrack;
use crate::render::{Child, Item, Key, Keyed, KeyedBuild, NodeRef, Resolved};

/// What a reactive content last rendered.
pub(crate) struct Reconciled {
    pub(super) mode: RenderMode,
    pub(super) entries: Vec<Entry>,
}

impl Default for Reconciled {
    fn default() -> Self {
        Self {
            mode: RenderMode::None,
            entries: Vec::new(),
        }
    }
}

/// One rendered item: its key, its nodes, and the instances that own them.
pub(crate) struct Entry {
    pub(super) key: Option<Key>,
    pub(super) nodes: SmallVec<[NodeRef; 1]>,
    pub(super) instances: Vec<Instance>,
}

impl ReactiveContent {
    pub(super) fn apply(&self, resolved: Resolved) {
        match resolved {
            Resolved::Empty => {
                if self.mode() != RenderMode::None {
                    self.replace_all(RenderMode::None, Vec::new());
                }
            }
            Resolved::Single(item) => {
                if let Item::Node(node) = &item {
                    if self.shows_only(*node) {
                        trace!(instance = %self.id(), %node, "same node; update skipped");
                        return;
                    }
                }
                let entry = self.build_item(item);
                self.replace_all(RenderMode::Single, vec![entry]);
            }
            Resolved::Plain(items) => {
                let entries = items.into_iter().map(|item| self.build_item(item)).collect();
                self.replace_all(RenderMode::Array, entries);
            }
            Resolved::Keyed(items) => self.reconcile_keyed(items),
        }
    }

    fn shows_only(&self, node: NodeRef) -> bool {
        let state = self.0.state.borrow();
        state.mode == RenderMode::Single
            && matches!(state.entries.as_slice(), [entry] if entry.nodes.as_slice() == [node])
    }

    // ---- Building ----

    fn build_item(&self, item: Item) -> Entry {
        let mut nodes = SmallVec::new();
        let mut instances = Vec::new();
        match item {
            Item::Text(text) => nodes.push(self.0.host.create_text(&text)),
            Item::Node(node) => nodes.push(node),
            Item::Component(component) => self.take_component(component, &mut nodes, &mut instances),
            Item::Keyed(keyed) => self.build_keyed(keyed.build, &mut nodes, &mut instances),
        }
        Entry {
            key: None,
            nodes,
            instances,
        }
    }

    fn build_keyed(
        &self,
        build: KeyedBuild,
        nodes: &mut SmallVec<[NodeRef; 1]>,
        instances: &mut Vec<Instance>,
    ) {
        match build {
            KeyedBuild::Node(node) => {
                nodes.push(node);
                self.claim_staged_under(node, instances);
            }
            KeyedBuild::Component(component) => self.take_component(component, nodes, instances),
            KeyedBuild::Lazy(build) => {
                let mark = self.staged_len();
                let child = untrack(build);
                instances.extend(self.drain_staged_from(mark));
                self.build_child(child, nodes, instances);
            }
        }
    }

    fn build_child(
        &self,
        child: Child,
        nodes: &mut SmallVec<[NodeRef; 1]>,
        instances: &mut Vec<Instance>,
    ) {
        match child {
            Child::Empty => {}
            Child::Text(text) => nodes.push(self.0.host.create_text(&text)),
            Child::Node(node) => nodes.push(node),
            Child::Component(component) => self.take_component(component, nodes, instances),
            Child::Keyed(keyed) => self.build_keyed(keyed.build, nodes, instances),
            Child::List(children) => {
                for child in children {
                    self.build_child(child, nodes, instances);
                }
            }
        }
    }

    /// Claim a component produced by the evaluation: staged components move
    /// into `instances`, already committed ones are kept.
    fn take_component(
        &self,
        component: Component,
        nodes: &mut SmallVec<[NodeRef; 1]>,
        instances: &mut Vec<Instance>,
    ) {
        nodes.extend(component.roots());
        let id = component.id();

        let staged = {
            let mut staged = self.0.staged.borrow_mut();
            staged
                .iter()
                .position(|instance| instance.id() == id)
                .map(|pos| staged.remove(pos))
        };
        if let Some(instance) = staged {
            instances.push(instance);
        } else if self.0.children.borrow().contains_key(&id) {
            instances.push(Instance::Component(component));
        }
    }

    /// Claim the staged instances anchored inside `node`'s subtree, such as
    /// reactive content inserted into a node before it was keyed.
    fn claim_staged_under(&self, node: NodeRef, instances: &mut Vec<Instance>) {
        let host = &self.0.host;
        let inside = |anchor: NodeRef| {
            let mut current = Some(anchor);
            while let Some(at) = current {
                if at == node {
                    return true;
                }
                current = host.parent_of(at);
            }
            false
        };

        let mut staged = self.0.staged.borrow_mut();
        let (claimed, rest): (Vec<Instance>, Vec<Instance>) =
            std::mem::take(&mut *staged).into_iter().partition(|instance| {
                let anchor = match instance {
                    Instance::Component(component) => component.roots().first().copied(),
                    Instance::Content(content) => Some(content.region().parent()),
                };
                anchor.is_some_and(|anchor| inside(anchor))
            });
        *staged = rest;
        instances.extend(claimed);
    }

    // ---- Replace-all ----

    fn replace_all(&self, mode: RenderMode, entries: Vec<Entry>) {
        let previous = self.mode();

        let mut committed: Vec<Instance> = entries
            .iter()
            .flat_map(|entry| entry.instances.iter().cloned())
            .collect();
        committed.extend(self.drain_staged_from(0));
        let keep: HashSet<InstanceId> = committed.iter().map(Instance::id).collect();

        let old_children = std::mem::take(&mut *self.0.children.borrow_mut());
        let old_ids: HashSet<InstanceId> = old_children.keys().copied().collect();
        for (id, child) in old_children {
            if !keep.contains(&id) {
                child.dispose();
            }
        }

        self.run_region_cleanups();
        self.0.region.clear();
        for entry in &entries {
            for node in &entry.nodes {
                self.0.region.insert_before(*node, None);
            }
        }

        let fresh: Vec<Instance> = committed
            .iter()
            .filter(|instance| !old_ids.contains(&instance.id()))
            .cloned()
            .collect();
        *self.0.children.borrow_mut() = committed
            .into_iter()
            .map(|instance| (instance.id(), instance))
            .collect();

        let node_count = entries.iter().map(|entry| entry.nodes.len()).sum::<usize>();
        *self.0.state.borrow_mut() = Reconciled { mode, entries };

        debug!(
            instance = %self.id(),
            from = ?previous,
            to = ?mode,
            nodes = node_count,
            "reactive content replaced"
        );

        if self.is_mounted() {
            for instance in fresh {
                instance.call_mount_callbacks();
            }
        }
    }

    // ---- Keyed diff ----

    fn reconcile_keyed(&self, items: Vec<Keyed>) {
        let unchanged = {
            let state = self.0.state.borrow();
            state.mode == RenderMode::Array
                && state.entries.len() == items.len()
                && state
                    .entries
                    .iter()
                    .zip(&items)
                    .all(|(entry, item)| entry.key.as_ref() == Some(&item.key))
        };
        if unchanged {
            trace!(instance = %self.id(), "key sequence unchanged; diff skipped");
            return;
        }

        let region = self.0.region.clone();
        let (previous, old_entries) = {
            let mut state = self.0.state.borrow_mut();
            (state.mode, std::mem::take(&mut state.entries))
        };
        let was_keyed =
            previous == RenderMode::Array && old_entries.iter().all(|entry| entry.key.is_some());

        // key the previous entries
        let mut old: IndexMap<Key, Entry> = IndexMap::with_capacity(old_entries.len());
        let mut leftovers = Vec::new();
        for entry in old_entries {
            match entry.key.clone() {
                Some(key) => {
                    old.insert(key, entry);
                }
                None => leftovers.push(entry),
            }
        }

        // unkeyed leftovers and the instances that owned them
        if !was_keyed {
            self.run_region_cleanups();
        }
        for entry in leftovers {
            for node in entry.nodes {
                region.remove(node);
            }
        }
        let owned: HashSet<InstanceId> = old
            .values()
            .flat_map(|entry| entry.instances.iter().map(Instance::id))
            .collect();
        let strays: Vec<Instance> = self
            .0
            .children
            .borrow()
            .values()
            .filter(|child| !owned.contains(&child.id()))
            .cloned()
            .collect();
        for stray in strays {
            stray.dispose();
        }

        // keys that are gone
        let new_keys: HashSet<&Key> = items.iter().map(|item| &item.key).collect();
        let gone: Vec<Key> = old
            .keys()
            .filter(|key| !new_keys.contains(key))
            .cloned()
            .collect();
        for key in &gone {
            if let Some(entry) = old.swap_remove(key) {
                for instance in entry.instances {
                    instance.dispose();
                }
                for node in entry.nodes {
                    region.remove(node);
                }
            }
        }

        // backwards walk from the end anchor
        let mut reference: Option<NodeRef> = None;
        let mut entries = Vec::with_capacity(items.len());
        let (mut reused, mut created, mut moved) = (0usize, 0usize, 0usize);

        for item in items.into_iter().rev() {
            let Keyed { key, build } = item;
            let entry = match old.swap_remove(&key) {
                Some(entry) => {
                    reused += 1;
                    if !region.is_placed_before(&entry.nodes, reference) {
                        moved += 1;
                        for node in &entry.nodes {
                            trace!(%key, %node, "moving keyed node");
                            region.insert_before(*node, reference);
                        }
                    }
                    // an eager component built for a reused key stays staged
                    // and is disposed when the evaluation ends
                    drop(build);
                    entry
                }
                None => {
                    created += 1;
                    let mut nodes = SmallVec::new();
                    let mut instances = Vec::new();
                    self.build_keyed(build, &mut nodes, &mut instances);
                    for node in &nodes {
                        region.insert_before(*node, reference);
                    }
                    if self.is_mounted() {
                        for instance in &instances {
                            instance.call_mount_callbacks();
                        }
                    }
                    Entry {
                        key: Some(key),
                        nodes,
                        instances,
                    }
                }
            };

            if let Some(first) = entry.nodes.first() {
                reference = Some(*first);
            }
            entries.push(entry);
        }
        entries.reverse();

        *self.0.children.borrow_mut() = entries
            .iter()
            .flat_map(|entry| entry.instances.iter())
            .map(|instance| (instance.id(), instance.clone()))
            .collect();
        *self.0.state.borrow_mut() = Reconciled {
            mode: RenderMode::Array,
            entries,
        };

        debug!(
            instance = %self.id(),
            reused,
            created,
            moved,
            removed = gone.len(),
            "keyed diff applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::render::{MemoryTree, Region, TreeStats};
    use crate::store::{StoreList, Value};

    fn keyed_letters(list: &StoreList) -> Vec<Child> {
        list.to_vec()
            .into_iter()
            .map(|value| {
                let text = value.to_text();
                Child::keyed(text.clone(), move || text)
            })
            .collect()
    }

    #[test]
    fn keyed_reorder_reuses_nodes() {
        let tree = Rc::new(MemoryTree::new());
        let root = tree.create_element("ul");
        let content = ReactiveContent::new(Region::new(tree.clone(), root), None, false);
        let list = StoreList::from_values(vec!["a".into(), "b".into(), "c".into()]);

        let list2 = list.clone();
        content.bind(move || keyed_letters(&list2)).unwrap();
        let before = content.region().nodes();
        tree.reset_stats();

        list.splice(0, 3, vec![Value::from("c"), "a".into(), "b".into()]);

        let after = content.region().nodes();
        assert_eq!(tree.inner(root), "cab");
        assert_eq!(after, vec![before[2], before[0], before[1]]);
        assert_eq!(tree.stats().created, 0);
    }

    #[test]
    fn unchanged_keys_skip_the_diff() {
        let tree = Rc::new(MemoryTree::new());
        let root = tree.create_element("ul");
        let content = ReactiveContent::new(Region::new(tree.clone(), root), None, false);
        let list = StoreList::from_values(vec!["a".into(), "b".into()]);
        let tick = crate::store::StoreMap::from_entries([("n", 0)]);

        let (list2, tick2) = (list.clone(), tick.clone());
        content
            .bind(move || {
                tick2.get("n");
                keyed_letters(&list2)
            })
            .unwrap();
        tree.reset_stats();

        tick.set("n", 1);
        assert_eq!(content.disposer().map(|d| d.run_count()), Some(2));
        assert_eq!(tree.stats(), TreeStats::default());
        assert_eq!(content.keys(), vec![Key::from("a"), Key::from("b")]);
    }

    #[test]
    fn switching_from_plain_to_keyed_drops_plain_nodes() {
        let tree = Rc::new(MemoryTree::new());
        let root = tree.create_element("ul");
        let region = Region::new(tree.clone(), root);
        let content = ReactiveContent::new(region.clone(), None, false);
        let keyed = crate::store::StoreMap::from_entries([("keyed", false)]);

        let keyed2 = keyed.clone();
        content
            .bind(move || {
                if keyed2.get("keyed").as_bool() == Some(true) {
                    vec![Child::keyed("x", || "x")]
                } else {
                    vec![Child::text("p"), Child::text("q")]
                }
            })
            .unwrap();
        region.add_cleanup(|| {});
        assert_eq!(tree.inner(root), "pq");

        keyed.set("keyed", true);
        assert_eq!(tree.inner(root), "x");
        assert_eq!(region.cleanup_count(), 0);
        assert_eq!(content.keys(), vec![Key::from("x")]);
    }
}
