//! The current-instance pointer.
//!
//! Entering a scope swaps the pointer and returns a guard; dropping the guard
//! (including during unwinding) puts the previous instance back, so scopes
//! nest like a stack without an explicit stack.

use std::cell::RefCell;
use std::rc::Rc;

use super::{Component, Instance, ReactiveContent};
use crate::render::{Host, Region};

thread_local! {
    static CURRENT_INSTANCE: RefCell<Option<Instance>> = const { RefCell::new(None) };
}

/// Restores the previous current instance on drop.
pub(crate) struct InstanceGuard {
    previous: Option<Instance>,
}

impl InstanceGuard {
    pub(crate) fn enter(instance: Instance) -> Self {
        let previous = CURRENT_INSTANCE.with(|current| current.replace(Some(instance)));
        Self { previous }
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_INSTANCE.with(|current| *current.borrow_mut() = previous);
    }
}

/// The instance whose evaluation is running, if any.
pub fn get_current_instance() -> Option<Instance> {
    CURRENT_INSTANCE.with(|current| current.borrow().clone())
}

/// The current instance if it is a component.
pub fn get_current_component() -> Option<Component> {
    match get_current_instance() {
        Some(Instance::Component(component)) => Some(component),
        _ => None,
    }
}

/// An entered component scope.
///
/// The component stays current until [`exit`](Self::exit) is called or the
/// scope is dropped.
pub struct ComponentScope {
    component: Component,
    _guard: InstanceGuard,
}

impl ComponentScope {
    fn enter(component: Component) -> Self {
        let guard = InstanceGuard::enter(Instance::Component(component.clone()));
        Self {
            component,
            _guard: guard,
        }
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    /// Leave the scope and hand back the component.
    pub fn exit(self) -> Component {
        let ComponentScope { component, _guard } = self;
        drop(_guard);
        component
    }
}

/// An entered reactive content scope.
pub struct ReactiveScope {
    content: ReactiveContent,
    _guard: InstanceGuard,
}

impl ReactiveScope {
    pub fn content(&self) -> &ReactiveContent {
        &self.content
    }

    /// Leave the scope and hand back the reactive content.
    pub fn exit(self) -> ReactiveContent {
        let ReactiveScope { content, _guard } = self;
        drop(_guard);
        content
    }
}

/// Create a component under `parent` and make it current.
pub fn enter_component_scope(parent: &Instance) -> ComponentScope {
    let component = Component::new(parent.host(), Some(parent), parent.is_component());
    ComponentScope::enter(component)
}

/// Create a parentless component and make it current.
pub fn enter_root_scope(host: Rc<dyn Host>) -> ComponentScope {
    ComponentScope::enter(Component::new(host, None, false))
}

/// Create reactive content for `region` under `parent` and make it current.
pub fn enter_reactive_scope(parent: &Instance, region: Region) -> ReactiveScope {
    let content = ReactiveContent::new(region, Some(parent), parent.is_component());
    let guard = InstanceGuard::enter(Instance::Content(content.clone()));
    ReactiveScope {
        content,
        _guard: guard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemoryTree;

    #[test]
    fn scopes_nest_and_restore() {
        let host = Rc::new(MemoryTree::new());
        assert!(get_current_instance().is_none());

        let root = enter_root_scope(host.clone());
        let root_instance = Instance::Component(root.component().clone());

        let node = host.create_element("div");
        let reactive = enter_reactive_scope(&root_instance, Region::new(host.clone(), node));
        assert!(get_current_component().is_none());
        assert!(get_current_instance().is_some_and(|i| !i.is_component()));

        let content = reactive.exit();
        assert!(get_current_component().is_some_and(|c| c.ptr_eq(root.component())));

        let root = root.exit();
        assert!(get_current_instance().is_none());
        assert_eq!(root.child_count(), 1);
        assert!(content.parent().is_some());
    }

    #[test]
    fn component_under_reactive_content_is_not_auto_registered() {
        let host = Rc::new(MemoryTree::new());
        let node = host.create_element("div");
        let content = ReactiveContent::new(Region::new(host.clone(), node), None, false);
        let parent = Instance::Content(content.clone());

        // idle content adopts
        let adopted = enter_component_scope(&parent).exit();
        assert_eq!(content.child_count(), 1);
        assert!(adopted.parent().is_some());
    }

    #[test]
    fn guard_restores_on_unwind() {
        let host = Rc::new(MemoryTree::new());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = enter_root_scope(host.clone());
            panic!("render failed");
        }));
        assert!(result.is_err());
        assert!(get_current_instance().is_none());
    }
}
