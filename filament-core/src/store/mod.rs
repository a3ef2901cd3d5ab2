//! Observable Stores
//!
//! State lives in explicit observable containers rather than in proxies over
//! arbitrary objects.
//!
//! # Containers
//!
//! - [`StoreMap`]: string-keyed fields in insertion order
//! - [`StoreList`]: an ordered sequence with intercepted mutators
//!
//! Both are `Rc` handles. Nested containers are stored as handles too, so
//! reading the same nested container twice yields the same handle and
//! reference equality means "no identity change".
//!
//! # Tracking
//!
//! Reads inside a running computation subscribe it to `(container, key)`.
//! Writes that change a value notify the subscribers, immediately or at the
//! end of the enclosing [`batch`](crate::reactive::batch).

mod value;
mod map;
mod list;

pub use value::Value;
pub use map::StoreMap;
pub use list::StoreList;

use serde::Serialize;

use crate::error::Result;

/// Wrap a value into a store.
///
/// Plain data (including `serde_json::Value` trees) becomes fresh containers.
/// A value that already holds a container comes back as that same container.
pub fn create_store(initial: impl Into<Value>) -> Value {
    initial.into()
}

/// Build a store from any serializable value.
pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    let json = serde_json::to_value(value)?;
    Ok(Value::from(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Todo {
        id: u32,
        title: String,
        done: bool,
    }

    #[test]
    fn wrapping_twice_is_identity_stable() {
        let store = create_store(json!({"user": {"name": "ada"}}));
        let again = create_store(store.clone());
        assert_eq!(store, again);

        let map = store.as_map().unwrap();
        assert_eq!(map.get("user"), map.get("user"));
    }

    #[test]
    fn serde_round_trip() {
        let todo = Todo {
            id: 7,
            title: "write tests".into(),
            done: false,
        };
        let store = from_serialize(&todo).unwrap();
        store.as_map().unwrap().set("done", true);

        let back: Todo = store.deserialize().unwrap();
        assert_eq!(back.id, 7);
        assert!(back.done);
    }

    #[test]
    fn deserialize_type_mismatch_is_an_error() {
        let store = create_store("text");
        assert!(store.deserialize::<Todo>().is_err());
    }
}
