//! Error types for the Filament runtime.
//!
//! Most failures in the runtime are usage errors that surface synchronously
//! to whoever triggered them. Panics raised by user closures are never caught;
//! they unwind through the engine after its internal pointers are restored.

use thiserror::Error;

use crate::instance::InstanceId;

/// Errors returned by the runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// A reactive array result mixed keyed and non-keyed items.
    ///
    /// The message is fixed so callers can match on it.
    #[error("Cannot mix keyed and non-keyed children in the same array")]
    MixedKeyedChildren,

    /// An operation that needs an enclosing instance ran outside of one.
    #[error("{0} requires an enclosing component or reactive content scope")]
    NoInstanceScope(&'static str),

    /// The target instance was already disposed.
    #[error("instance {0:?} has already been disposed")]
    Disposed(InstanceId),

    /// Converting between a store and a serde data model failed.
    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_keyed_message_is_stable() {
        assert_eq!(
            Error::MixedKeyedChildren.to_string(),
            "Cannot mix keyed and non-keyed children in the same array"
        );
    }

    #[test]
    fn serde_errors_convert() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
