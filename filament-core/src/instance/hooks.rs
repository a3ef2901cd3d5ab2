//! Lifecycle hooks for render functions.
//!
//! Hooks attach to the current component. Called anywhere else they log a
//! warning (unless disabled in [`Config`](crate::config::Config)) and the
//! registration is dropped.

use tracing::warn;

use super::scope::{get_current_component, get_current_instance};
use super::Component;
use crate::config::config;
use crate::reactive::{autorun, Disposer, OnCleanup};

fn current_component(hook: &'static str) -> Option<Component> {
    let component = get_current_component();
    if component.is_none() && config().warn_on_orphan_hooks {
        warn!(hook, "called outside of a component; registration dropped");
    }
    component
}

/// Run `callback` once the current component is mounted.
pub fn on_mount(callback: impl FnOnce() + 'static) {
    if let Some(component) = current_component("on_mount") {
        component.add_mount_callback(callback);
    }
}

/// Run `cleanup` when the current component is disposed.
pub fn on_cleanup(cleanup: impl FnOnce() + 'static) {
    if let Some(component) = current_component("on_cleanup") {
        component.add_cleanup(cleanup);
    }
}

/// Start a computation owned by the current component.
///
/// Outside a component the computation still runs, and the caller owns the
/// returned disposer.
pub fn create_effect<F>(effect: F) -> Disposer
where
    F: FnMut(&OnCleanup) + 'static,
{
    let owner = current_component("create_effect");
    let disposer = autorun(effect);
    if let Some(owner) = owner {
        owner.add_autorun_disposal(disposer.clone());
    }
    disposer
}

/// Make `value` available to the current component and its descendants.
pub fn provide_context<T: 'static>(value: T) {
    if let Some(component) = current_component("provide_context") {
        component.provide(value);
    }
}

/// The nearest value of type `T` provided by the current instance or one of
/// its ancestors.
pub fn use_context<T: Clone + 'static>() -> Option<T> {
    let mut next = get_current_instance();
    while let Some(instance) = next {
        if let Some(value) = instance.as_component().and_then(Component::lookup::<T>) {
            return Some(value);
        }
        next = instance.parent();
    }
    None
}
