//! Instance Tree
//!
//! A logical ownership tree that runs parallel to the output tree. Every
//! instance owns its children and cleanups, and disposing an instance
//! disposes its whole subtree.
//!
//! # Variants
//!
//! - [`Component`]: one execution of a render function
//! - [`ReactiveContent`]: one reactive expression bound to a [`Region`]
//!
//! # Registration
//!
//! A component registers itself with a component parent as soon as it is
//! constructed. Under a reactive content parent it does not: instances created
//! while reactive content evaluates are staged, and only become children once
//! the evaluation has been applied. Anything still staged afterwards is
//! disposed.
//!
//! [`Region`]: crate::render::Region

mod component;
mod content;
mod reconcile;
mod scope;
mod hooks;
mod helpers;

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

pub use component::Component;
pub use content::{ReactiveContent, RenderMode};
pub use scope::{
    enter_component_scope, enter_reactive_scope, enter_root_scope, get_current_component,
    get_current_instance, ComponentScope, ReactiveScope,
};
pub use hooks::{create_effect, on_cleanup, on_mount, provide_context, use_context};
pub use helpers::{component, insert_reactive, mount};

pub(crate) use component::WeakComponent;
pub(crate) use content::WeakContent;
pub(crate) use scope::InstanceGuard;

use crate::render::Host;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn new() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// An owning node of the instance tree.
#[derive(Debug, Clone)]
pub enum Instance {
    Component(Component),
    Content(ReactiveContent),
}

impl Instance {
    pub fn id(&self) -> InstanceId {
        match self {
            Instance::Component(c) => c.id(),
            Instance::Content(c) => c.id(),
        }
    }

    pub fn host(&self) -> Rc<dyn Host> {
        match self {
            Instance::Component(c) => c.host().clone(),
            Instance::Content(c) => c.host().clone(),
        }
    }

    pub fn parent(&self) -> Option<Instance> {
        match self {
            Instance::Component(c) => c.parent(),
            Instance::Content(c) => c.parent(),
        }
    }

    pub fn children(&self) -> Vec<Instance> {
        match self {
            Instance::Component(c) => c.children(),
            Instance::Content(c) => c.children(),
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(self, Instance::Component(_))
    }

    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Instance::Component(c) => Some(c),
            Instance::Content(_) => None,
        }
    }

    pub fn as_content(&self) -> Option<&ReactiveContent> {
        match self {
            Instance::Content(c) => Some(c),
            Instance::Component(_) => None,
        }
    }

    pub fn is_disposed(&self) -> bool {
        match self {
            Instance::Component(c) => c.is_disposed(),
            Instance::Content(c) => c.is_disposed(),
        }
    }

    /// Dispose this instance and its subtree. Idempotent.
    pub fn dispose(&self) {
        match self {
            Instance::Component(c) => c.dispose(),
            Instance::Content(c) => c.dispose(),
        }
    }

    pub fn call_mount_callbacks(&self) {
        match self {
            Instance::Component(c) => c.call_mount_callbacks(),
            Instance::Content(c) => c.call_mount_callbacks(),
        }
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        match (self, other) {
            (Instance::Component(a), Instance::Component(b)) => a.ptr_eq(b),
            (Instance::Content(a), Instance::Content(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub(crate) fn downgrade(&self) -> WeakInstance {
        match self {
            Instance::Component(c) => WeakInstance::Component(c.downgrade()),
            Instance::Content(c) => WeakInstance::Content(c.downgrade()),
        }
    }

    pub(crate) fn remove_child(&self, id: InstanceId) {
        match self {
            Instance::Component(c) => c.remove_child(id),
            Instance::Content(c) => c.remove_child(id),
        }
    }

    /// Hook a freshly constructed instance into its parent.
    ///
    /// With `auto_register` the child is added right away. Otherwise a
    /// reactive content parent stages it while evaluating and adopts it
    /// directly when idle, and a component parent leaves it to the caller.
    pub(crate) fn attach_child(&self, child: Instance, auto_register: bool) {
        match self {
            Instance::Component(c) if auto_register => c.add_child(child),
            Instance::Component(_) => {}
            Instance::Content(c) if auto_register => c.adopt(child),
            Instance::Content(c) => c.stage_or_adopt(child),
        }
    }
}

impl From<Component> for Instance {
    fn from(component: Component) -> Self {
        Instance::Component(component)
    }
}

impl From<ReactiveContent> for Instance {
    fn from(content: ReactiveContent) -> Self {
        Instance::Content(content)
    }
}

/// Non-owning parent link.
#[derive(Clone)]
pub(crate) enum WeakInstance {
    Component(WeakComponent),
    Content(WeakContent),
}

impl WeakInstance {
    pub(crate) fn upgrade(&self) -> Option<Instance> {
        match self {
            WeakInstance::Component(w) => w.upgrade().map(Instance::Component),
            WeakInstance::Content(w) => w.upgrade().map(Instance::Content),
        }
    }
}
