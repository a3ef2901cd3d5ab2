//! Reactive content.
//!
//! A [`ReactiveContent`] binds one reactive expression to a [`Region`]. Its
//! driving computation re-evaluates the expression whenever something it read
//! changes, and the reconciler patches the region to match the new result.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, error};

use super::reconcile::Reconciled;
use super::{Instance, InstanceGuard, InstanceId, WeakInstance};
use crate::error::{Error, Result};
use crate::reactive::{autorun, untrack, Disposer};
use crate::render::{Child, Host, Key, Region};

type Callback = Box<dyn FnOnce()>;

/// What a reactive content currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Nothing.
    None,
    /// One item.
    Single,
    /// A list, keyed or not.
    Array,
}

pub(crate) struct ContentInner {
    pub(super) id: InstanceId,
    pub(super) host: Rc<dyn Host>,
    pub(super) parent: RefCell<Option<WeakInstance>>,
    pub(super) region: Region,
    pub(super) children: RefCell<IndexMap<InstanceId, Instance>>,
    pub(super) staged: RefCell<Vec<Instance>>,
    pub(super) evaluating: Cell<bool>,
    pub(super) cleanups: RefCell<SmallVec<[Callback; 1]>>,
    pub(super) disposer: RefCell<Option<Disposer>>,
    pub(super) state: RefCell<Reconciled>,
    pub(super) last_error: RefCell<Option<Error>>,
    pub(super) mounted: Cell<bool>,
    pub(super) disposed: Cell<bool>,
}

/// One reactive expression bound to a region.
#[derive(Clone)]
pub struct ReactiveContent(pub(super) Rc<ContentInner>);

#[derive(Clone)]
pub(crate) struct WeakContent(Weak<ContentInner>);

impl WeakContent {
    pub(crate) fn upgrade(&self) -> Option<ReactiveContent> {
        self.0.upgrade().map(ReactiveContent)
    }
}

impl ReactiveContent {
    /// Create reactive content managing `region`, owned by `parent`.
    ///
    /// See [`Component::new`](super::Component::new) for `auto_register`.
    pub fn new(region: Region, parent: Option<&Instance>, auto_register: bool) -> Self {
        let content = Self(Rc::new(ContentInner {
            id: InstanceId::new(),
            host: region.host().clone(),
            parent: RefCell::new(parent.map(Instance::downgrade)),
            region,
            children: RefCell::new(IndexMap::new()),
            staged: RefCell::new(Vec::new()),
            evaluating: Cell::new(false),
            cleanups: RefCell::new(SmallVec::new()),
            disposer: RefCell::new(None),
            state: RefCell::new(Reconciled::default()),
            last_error: RefCell::new(None),
            mounted: Cell::new(false),
            disposed: Cell::new(false),
        }));

        if let Some(parent) = parent {
            parent.attach_child(Instance::Content(content.clone()), auto_register);
        }
        content
    }

    pub fn id(&self) -> InstanceId {
        self.0.id
    }

    pub fn host(&self) -> &Rc<dyn Host> {
        &self.0.host
    }

    pub fn region(&self) -> &Region {
        &self.0.region
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

    pub fn ptr_eq(&self, other: &ReactiveContent) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakContent {
        WeakContent(Rc::downgrade(&self.0))
    }

    pub fn mode(&self) -> RenderMode {
        self.0.state.borrow().mode
    }

    /// Keys of the rendered keyed list, in order. Empty unless the content
    /// shows a keyed list.
    pub fn keys(&self) -> Vec<Key> {
        self.0
            .state
            .borrow()
            .entries
            .iter()
            .filter_map(|entry| entry.key.clone())
            .collect()
    }

    /// The driving computation, once bound.
    pub fn disposer(&self) -> Option<Disposer> {
        self.0.disposer.borrow().clone()
    }

    /// The error of the last failed re-run, if any.
    pub fn take_error(&self) -> Option<Error> {
        self.0.last_error.borrow_mut().take()
    }

    /// Register a cleanup. It runs once, when the content is disposed.
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

    pub(crate) fn adopt(&self, child: Instance) {
        if self.is_disposed() {
            child.dispose();
            return;
        }
        self.0.children.borrow_mut().insert(child.id(), child);
    }

    pub(crate) fn stage_or_adopt(&self, child: Instance) {
        if self.0.evaluating.get() {
            self.0.staged.borrow_mut().push(child);
        } else {
            self.adopt(child);
        }
    }

    pub(crate) fn remove_child(&self, id: InstanceId) {
        self.0.children.borrow_mut().shift_remove(&id);
        self.0.staged.borrow_mut().retain(|staged| staged.id() != id);
    }

    /// Number of instances created by the running evaluation and not yet
    /// committed.
    pub(super) fn staged_len(&self) -> usize {
        self.0.staged.borrow().len()
    }

    pub(super) fn drain_staged_from(&self, mark: usize) -> Vec<Instance> {
        let mut staged = self.0.staged.borrow_mut();
        let mark = mark.min(staged.len());
        staged.drain(mark..).collect()
    }

    /// Bind `expr` and render its first result.
    ///
    /// Errors from the first evaluation are returned and leave the content
    /// unbound. Errors from later re-runs are logged and kept for
    /// [`take_error`](Self::take_error); the previous output stays.
    pub fn bind<F, C>(&self, expr: F) -> Result<()>
    where
        F: FnMut() -> C + 'static,
        C: Into<Child>,
    {
        if self.is_disposed() {
            return Err(Error::Disposed(self.0.id));
        }
        let previous = self.0.disposer.borrow_mut().take();
        if let Some(previous) = previous {
            previous.dispose();
        }

        let weak = Rc::downgrade(&self.0);
        let first_error: Rc<RefCell<Option<Error>>> = Rc::new(RefCell::new(None));
        let first_run = Rc::new(Cell::new(true));
        let mut expr = expr;

        let disposer = autorun({
            let first_error = first_error.clone();
            move |_| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let content = ReactiveContent(inner);
                let mut evaluate = || -> Child { expr().into() };
                let result = content.update(&mut evaluate);

                match result {
                    Ok(()) => {}
                    Err(err) if first_run.get() => *first_error.borrow_mut() = Some(err),
                    Err(err) => {
                        error!(instance = %content.0.id, error = %err, "reactive content re-run failed");
                        *content.0.last_error.borrow_mut() = Some(err);
                    }
                }
                first_run.set(false);
            }
        });

        let failed = first_error.borrow_mut().take();
        if let Some(err) = failed {
            disposer.dispose();
            return Err(err);
        }
        *self.0.disposer.borrow_mut() = Some(disposer);
        Ok(())
    }

    /// Evaluate the expression in this content's scope and apply the result.
    fn update(&self, expr: &mut dyn FnMut() -> Child) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }
        let _evaluation = Evaluation::enter(self);
        let resolved = expr().resolve()?;
        self.apply(resolved);
        Ok(())
    }

    /// Fire mount callbacks of the committed children and mark the content
    /// mounted, so children committed later fire theirs on commit.
    pub fn call_mount_callbacks(&self) {
        if self.is_disposed() {
            return;
        }
        self.0.mounted.set(true);
        for child in self.children() {
            child.call_mount_callbacks();
        }
    }

    pub(super) fn is_mounted(&self) -> bool {
        self.0.mounted.get()
    }

    /// Run the cleanups registered on the region.
    pub(super) fn run_region_cleanups(&self) {
        for cleanup in self.0.region.take_cleanups() {
            untrack(cleanup);
        }
    }

    /// Dispose children, run cleanups, stop the driving computation, then
    /// clear the region and leave the parent. Idempotent.
    pub fn dispose(&self) {
        if self.0.disposed.replace(true) {
            return;
        }
        debug!(
            instance = %self.0.id,
            children = self.0.children.borrow().len(),
            "disposing reactive content"
        );

        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        let staged = std::mem::take(&mut *self.0.staged.borrow_mut());
        for child in children.into_values().chain(staged) {
            child.dispose();
        }

        let cleanups = std::mem::take(&mut *self.0.cleanups.borrow_mut());
        for cleanup in cleanups {
            untrack(cleanup);
        }
        self.run_region_cleanups();

        let disposer = self.0.disposer.borrow_mut().take();
        if let Some(disposer) = disposer {
            disposer.dispose();
        }

        self.0.region.clear();
        *self.0.state.borrow_mut() = Reconciled::default();

        let parent = self.0.parent.borrow_mut().take();
        if let Some(parent) = parent.and_then(|p| p.upgrade()) {
            parent.remove_child(self.0.id);
        }
    }
}

impl fmt::Debug for ReactiveContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveContent")
            .field("id", &self.0.id)
            .field("mode", &self.mode())
            .field("children", &self.0.children.borrow().len())
            .field("region", &self.0.region)
            .field("disposed", &self.0.disposed.get())
            .finish()
    }
}

/// An evaluation in progress.
///
/// Makes the content the current instance and stages instances created under
/// it. On exit, normal or unwinding, whatever is still staged is disposed.
struct Evaluation<'a> {
    content: &'a ReactiveContent,
    _scope: InstanceGuard,
}

impl<'a> Evaluation<'a> {
    fn enter(content: &'a ReactiveContent) -> Self {
        let scope = InstanceGuard::enter(Instance::Content(content.clone()));
        content.0.evaluating.set(true);
        Self {
            content,
            _scope: scope,
        }
    }
}

impl Drop for Evaluation<'_> {
    fn drop(&mut self) {
        self.content.0.evaluating.set(false);
        let leftovers = std::mem::take(&mut *self.content.0.staged.borrow_mut());
        for instance in leftovers {
            instance.dispose();
        }
    }
}
