//! Rendering entry points.

use std::rc::Rc;

use tracing::warn;

use super::scope::{enter_component_scope, enter_root_scope, get_current_instance};
use super::{Component, ReactiveContent};
use crate::error::{Error, Result};
use crate::reactive::untrack;
use crate::render::{Child, Host, NodeRef, Region};

/// Render `body` as a root component appended to `container`, then fire
/// its mount callbacks.
pub fn mount<C: Into<Child>>(
    host: Rc<dyn Host>,
    container: NodeRef,
    body: impl FnOnce() -> C,
) -> Component {
    let scope = enter_root_scope(host.clone());
    let child: Child = untrack(body).into();
    let nodes = child.into_nodes(&*host);
    for node in &nodes {
        host.insert_before(container, *node, None);
    }
    scope.component().set_roots(nodes);

    let component = scope.exit();
    component.call_mount_callbacks();
    component
}

/// Render `body` as a component nested in the current instance.
///
/// The body runs untracked: reads inside it do not make the enclosing
/// reactive content re-run. The returned child carries the component, so a
/// reactive content commits it along with its nodes.
pub fn component<C: Into<Child>>(body: impl FnOnce() -> C) -> Child {
    let Some(parent) = get_current_instance() else {
        warn!("component rendered outside of any instance; nothing rendered");
        return Child::Empty;
    };

    let scope = enter_component_scope(&parent);
    let host = parent.host();
    let child: Child = untrack(body).into();
    let nodes = child.into_nodes(&*host);
    scope.component().set_roots(nodes);
    Child::Component(scope.exit())
}

/// Bind a reactive expression to a new region at the end of `parent_node`,
/// owned by the current instance.
pub fn insert_reactive<F, C>(parent_node: NodeRef, expr: F) -> Result<ReactiveContent>
where
    F: FnMut() -> C + 'static,
    C: Into<Child>,
{
    let parent = get_current_instance().ok_or(Error::NoInstanceScope("insert_reactive"))?;
    let region = Region::new(parent.host(), parent_node);
    let content = ReactiveContent::new(region, Some(&parent), parent.is_component());

    if let Err(err) = content.bind(expr) {
        content.dispose();
        return Err(err);
    }
    Ok(content)
}
