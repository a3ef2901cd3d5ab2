//! Integration Tests for Async Resources
//!
//! Loads run on a `LocalSet`; the tests check how settled loads reach the
//! rendered output and the enclosing boundary.

use std::rc::Rc;

use filament_core::instance::{component, insert_reactive, mount};
use filament_core::render::{Child, MemoryTree};
use filament_core::resource::{provide_boundary, Boundary, Resource, ResourceState};
use tokio::sync::oneshot;
use tokio::task::LocalSet;

fn show(resource: &Resource<String>) -> Child {
    match resource.state() {
        ResourceState::Idle => Child::Empty,
        ResourceState::Pending => Child::text("loading"),
        ResourceState::Resolved(text) => Child::text(text),
        ResourceState::Rejected(message) => Child::text(format!("error: {message}")),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn resolved_resource_rerenders_content() {
    LocalSet::new()
        .run_until(async {
            let tree = Rc::new(MemoryTree::new());
            let body = tree.create_element("body");
            let resource = Resource::<String>::new();

            let (tree2, resource2) = (tree.clone(), resource.clone());
            let app = mount(tree.clone(), body, move || {
                let p = tree2.create_element("p");
                insert_reactive(p, move || show(&resource2)).unwrap();
                p
            });
            assert_eq!(tree.inner(body), "<p></p>");

            let (tx, rx) = oneshot::channel::<String>();
            let handle = resource.load(async move { rx.await.map_err(|err| err.to_string()) });
            assert_eq!(tree.inner(body), "<p>loading</p>");

            tx.send("ready".into()).unwrap();
            handle.await.unwrap();
            assert_eq!(tree.inner(body), "<p>ready</p>");

            app.dispose();
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn boundary_tracks_nested_resources() {
    LocalSet::new()
        .run_until(async {
            let tree = Rc::new(MemoryTree::new());
            let body = tree.create_element("body");
            let slots: Rc<std::cell::RefCell<Option<(Boundary, Resource<String>, Resource<String>)>>> =
                Rc::default();

            let (tree2, slots2) = (tree.clone(), slots.clone());
            let app = mount(tree.clone(), body, move || {
                let boundary = provide_boundary();
                let (slots3, boundary2) = (slots2.clone(), boundary.clone());
                let loader = component(move || {
                    let first = Resource::<String>::new();
                    let second = Resource::<String>::new();
                    *slots3.borrow_mut() = Some((boundary2, first, second));
                    Child::Empty
                });

                let div = tree2.create_element("div");
                insert_reactive(div, move || {
                    if boundary.is_pending() {
                        "pending".to_string()
                    } else {
                        boundary.errors().join(",")
                    }
                })
                .unwrap();
                vec![Child::from(div), loader]
            });
            let (boundary, first, second) = slots.borrow_mut().take().unwrap();

            let ok = first.load(async { Ok::<_, String>("one".to_string()) });
            let failed = second.load(async { Err::<String, _>("offline") });
            assert_eq!(boundary.pending(), 2);
            assert_eq!(tree.inner(body), "<div>pending</div>");

            ok.await.unwrap();
            assert_eq!(boundary.pending(), 1);
            failed.await.unwrap();
            assert_eq!(boundary.pending(), 0);
            assert_eq!(tree.inner(body), "<div>offline</div>");

            boundary.clear_errors();
            assert_eq!(tree.inner(body), "<div></div>");
            app.dispose();
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn disposal_cancels_in_flight_loads() {
    LocalSet::new()
        .run_until(async {
            let tree = Rc::new(MemoryTree::new());
            let body = tree.create_element("body");
            let slot: Rc<std::cell::RefCell<Option<(Boundary, Resource<String>)>>> = Rc::default();

            let slot2 = slot.clone();
            let app = mount(tree.clone(), body, move || {
                let boundary = provide_boundary();
                *slot2.borrow_mut() = Some((boundary, Resource::new()));
                Child::Empty
            });
            let (boundary, resource) = slot.borrow_mut().take().unwrap();

            let (tx, rx) = oneshot::channel::<String>();
            let handle = resource.load(async move { rx.await.map_err(|err| err.to_string()) });
            assert_eq!(boundary.pending(), 1);

            app.dispose();
            assert!(resource.is_cancelled());
            assert_eq!(boundary.pending(), 0);

            tx.send("late".into()).unwrap();
            handle.await.unwrap();
            assert_eq!(resource.peek(), ResourceState::Pending);
        })
        .await;
}
