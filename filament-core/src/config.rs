//! Runtime configuration.
//!
//! The runtime is confined to one thread, so configuration is per thread as
//! well. Install a [`Config`] with [`configure`] before building any UI on
//! that thread; later calls replace it.

use std::cell::RefCell;

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Tunables for the reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum nesting of synchronous notification flushes.
    ///
    /// A write performed while re-running a computation flushes immediately,
    /// nested inside the outer flush. Flushes deeper than this are dropped
    /// and logged instead of overflowing the stack.
    pub max_notify_depth: usize,

    /// Log a warning when a lifecycle hook runs outside a component.
    pub warn_on_orphan_hooks: bool,
}

impl Config {
    /// The default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set [`Config::max_notify_depth`].
    pub fn with_max_notify_depth(mut self, depth: usize) -> Self {
        self.max_notify_depth = depth;
        self
    }

    /// Set [`Config::warn_on_orphan_hooks`].
    pub fn with_warn_on_orphan_hooks(mut self, warn: bool) -> Self {
        self.warn_on_orphan_hooks = warn;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_notify_depth: 128,
            warn_on_orphan_hooks: true,
        }
    }
}

/// Install the configuration for the current thread.
pub fn configure(config: Config) {
    CONFIG.with(|cell| *cell.borrow_mut() = config);
}

/// The configuration of the current thread.
pub fn config() -> Config {
    CONFIG.with(|cell| cell.borrow().clone())
}
