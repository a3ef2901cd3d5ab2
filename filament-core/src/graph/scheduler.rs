//! Notification Scheduler
//!
//! Writes performed while a batch is open are not delivered immediately.
//! They are parked here, deduplicated by `(object, property)`, and drained
//! once the outermost batch closes.
//!
//! # Algorithm
//!
//! 1. A write inside a batch pushes its [`Dep`] onto the queue. A dep that is
//!    already queued keeps its original position.
//! 2. When the outermost batch exits, the queue is drained in insertion order.
//! 3. The drained deps are flushed as one notification pass: every computation
//!    listening to any of them re-runs once, in first-notified order.

use indexmap::IndexSet;

use super::node::Dep;

/// Pending notifications of the currently open batch.
#[derive(Debug, Default)]
pub(crate) struct NotifyQueue {
    batching: bool,
    pending: IndexSet<Dep>,
}

impl NotifyQueue {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a batch is open.
    pub fn is_batching(&self) -> bool {
        self.batching
    }

    /// Set the batching flag, returning its previous value.
    pub fn set_batching(&mut self, batching: bool) -> bool {
        std::mem::replace(&mut self.batching, batching)
    }

    /// Queue a notification. Returns `false` if it was already queued.
    pub fn push(&mut self, dep: Dep) -> bool {
        self.pending.insert(dep)
    }

    /// Take every queued notification, in the order they were first queued.
    pub fn drain(&mut self) -> Vec<Dep> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    /// Drop every queued notification.
    pub fn discard(&mut self) {
        self.pending.clear();
    }

    /// Number of queued notifications.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ObjectId, PropKey};

    #[test]
    fn queue_deduplicates_and_keeps_order() {
        let mut queue = NotifyQueue::new();
        let object = ObjectId::new();
        let a = Dep::new(object, PropKey::field("a"));
        let b = Dep::new(object, PropKey::field("b"));

        assert!(queue.push(a.clone()));
        assert!(queue.push(b.clone()));
        assert!(!queue.push(a.clone()));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.drain(), vec![a, b]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn batching_flag_reports_previous_value() {
        let mut queue = NotifyQueue::new();
        assert!(!queue.set_batching(true));
        assert!(queue.set_batching(true));
        assert!(queue.is_batching());
        assert!(queue.set_batching(false));
    }
}
