//! Components.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::debug;

use super::{Instance, InstanceId, WeakInstance};
use crate::reactive::{untrack, Disposer};
use crate::render::{Host, NodeRef};

type Callback = Box<dyn FnOnce()>;

pub(crate) struct ComponentInner {
    id: InstanceId,
    host: Rc<dyn Host>,
    parent: RefCell<Option<WeakInstance>>,
    children: RefCell<IndexMap<InstanceId, Instance>>,
    cleanups: RefCell<Vec<Callback>>,
    autorun_disposals: RefCell<Vec<Disposer>>,
    mount_callbacks: RefCell<Vec<Callback>>,
    roots: RefCell<SmallVec<[NodeRef; 1]>>,
    contexts: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
    disposed: Cell<bool>,
}

/// One execution of a render function.
///
/// The handle is cheap to clone. The instance lives until it is disposed,
/// normally by its parent.
#[derive(Clone)]
pub struct Component(Rc<ComponentInner>);

#[derive(Clone)]
pub(crate) struct WeakComponent(Weak<ComponentInner>);

impl WeakComponent {
    pub(crate) fn upgrade(&self) -> Option<Component> {
        self.0.upgrade().map(Component)
    }
}

impl Component {
    /// Create a component under `parent`.
    ///
    /// `auto_register` decides whether the component adds itself to the
    /// parent's children now. Pass `parent.is_component()`: under reactive
    /// content the component is staged until the content commits it.
    pub fn new(host: Rc<dyn Host>, parent: Option<&Instance>, auto_register: bool) -> Self {
        let component = Self(Rc::new(ComponentInner {
            id: InstanceId::new(),
            host,
            parent: RefCell::new(parent.map(Instance::downgrade)),
            children: RefCell::new(IndexMap::new()),
            cleanups: RefCell::new(Vec::new()),
            autorun_disposals: RefCell::new(Vec::new()),
            mount_callbacks: RefCell::new(Vec::new()),
            roots: RefCell::new(SmallVec::new()),
            contexts: RefCell::new(HashMap::new()),
            disposed: Cell::new(false),
        }));

        if let Some(parent) = parent {
            parent.attach_child(Instance::Component(component.clone()), auto_register);
        }
        component
    }

    pub fn id(&self) -> InstanceId {
        self.0.id
    }

    pub fn host(&self) -> &Rc<dyn Host> {
        &self.0.host
    }

    pub fn parent(&self) -> Option<Instance> {
        self.0.parent.borrow().as_ref().and_then(WeakInstance::upgrade)
    }

    pub fn children(&self) -> Vec<Instance> {
        self.0.children.borrow().values().cloned().collect()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.get()
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakComponent {
        WeakComponent(Rc::downgrade(&self.0))
    }

    /// The output nodes this component rendered.
    pub fn roots(&self) -> Vec<NodeRef> {
        self.0.roots.borrow().to_vec()
    }

    pub fn set_roots(&self, roots: impl IntoIterator<Item = NodeRef>) {
        *self.0.roots.borrow_mut() = roots.into_iter().collect();
    }

    pub(crate) fn add_child(&self, child: Instance) {
        if self.is_disposed() {
            child.dispose();
            return;
        }
        self.0.children.borrow_mut().insert(child.id(), child);
    }

    pub(crate) fn remove_child(&self, id: InstanceId) {
        self.0.children.borrow_mut().shift_remove(&id);
    }

    /// Register a cleanup. It runs once, when the component is disposed.
    pub fn add_cleanup(&self, cleanup: impl FnOnce() + 'static) {
        if self.is_disposed() {
            untrack(cleanup);
            return;
        }
        self.0.cleanups.borrow_mut().push(Box::new(cleanup));
    }

    pub fn cleanup_count(&self) -> usize {
        self.0.cleanups.borrow().len()
    }

    /// Keep a computation alive until the component is disposed.
    pub fn add_autorun_disposal(&self, disposer: Disposer) {
        if self.is_disposed() {
            disposer.dispose();
            return;
        }
        self.0.autorun_disposals.borrow_mut().push(disposer);
    }

    pub fn autorun_count(&self) -> usize {
        self.0.autorun_disposals.borrow().len()
    }

    /// Defer a callback until the component is mounted.
    pub fn add_mount_callback(&self, callback: impl FnOnce() + 'static) {
        if !self.is_disposed() {
            self.0.mount_callbacks.borrow_mut().push(Box::new(callback));
        }
    }

    pub fn mount_callback_count(&self) -> usize {
        self.0.mount_callbacks.borrow().len()
    }

    /// Fire deferred mount callbacks, children first.
    ///
    /// Each callback fires at most once; calling this again only reaches
    /// callbacks registered since.
    pub fn call_mount_callbacks(&self) {
        if self.is_disposed() {
            return;
        }
        for child in self.children() {
            child.call_mount_callbacks();
        }
        let callbacks = std::mem::take(&mut *self.0.mount_callbacks.borrow_mut());
        for callback in callbacks {
            // a read here must not subscribe the content being evaluated
            untrack(callback);
        }
    }

    pub(crate) fn provide<T: 'static>(&self, value: T) {
        self.0
            .contexts
            .borrow_mut()
            .insert(TypeId::of::<T>(), Rc::new(value));
    }

    pub(crate) fn lookup<T: Clone + 'static>(&self) -> Option<T> {
        self.0
            .contexts
            .borrow()
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Dispose the subtree, then this component.
    ///
    /// Children go first, then cleanups, then owned computations. Afterwards
    /// the component leaves its parent and its roots leave the output tree.
    /// Calling this again is a no-op.
    pub fn dispose(&self) {
        if self.0.disposed.replace(true) {
            return;
        }
        debug!(
            instance = %self.0.id,
            children = self.0.children.borrow().len(),
            "disposing component"
        );

        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        for child in children.into_values() {
            child.dispose();
        }

        let cleanups = std::mem::take(&mut *self.0.cleanups.borrow_mut());
        for cleanup in cleanups {
            untrack(cleanup);
        }

        let disposals = std::mem::take(&mut *self.0.autorun_disposals.borrow_mut());
        for disposer in disposals {
            disposer.dispose();
        }

        let parent = self.0.parent.borrow_mut().take();
        if let Some(parent) = parent.and_then(|p| p.upgrade()) {
            parent.remove_child(self.0.id);
        }

        let roots = std::mem::take(&mut *self.0.roots.borrow_mut());
        for root in roots {
            if let Some(parent_node) = self.0.host.parent_of(root) {
                self.0.host.remove(parent_node, root);
            }
        }

        self.0.mount_callbacks.borrow_mut().clear();
        self.0.contexts.borrow_mut().clear();
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.0.id)
            .field("children", &self.0.children.borrow().len())
            .field("roots", &self.0.roots.borrow())
            .field("disposed", &self.0.disposed.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
