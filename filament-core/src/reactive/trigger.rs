//! A data-less dependency source.
//!
//! Collaborators that keep their own state outside a store (the async layer,
//! for one) use a trigger to make that state observable: read paths call
//! [`Trigger::track`], write paths call [`Trigger::notify`].

use super::runtime::Runtime;
use crate::graph::{Dep, ObjectId, PropKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    id: ObjectId,
}

impl Trigger {
    pub fn new() -> Self {
        Self { id: ObjectId::new() }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Make the current computation depend on this trigger.
    pub fn track(&self) {
        Runtime::track(self.dep());
    }

    /// Re-run every computation depending on this trigger.
    pub fn notify(&self) {
        Runtime::notify(self.dep());
    }

    fn dep(&self) -> Dep {
        Dep::new(self.id, PropKey::Version)
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::autorun;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn trigger_reruns_trackers() {
        let trigger = Trigger::new();
        let runs = Rc::new(Cell::new(0));

        let (trigger2, runs2) = (trigger.clone(), runs.clone());
        let disposer = autorun(move |_| {
            trigger2.track();
            runs2.set(runs2.get() + 1);
        });

        trigger.notify();
        trigger.notify();
        assert_eq!(runs.get(), 3);
        disposer.dispose();
    }
}
