//! Observer types for the object model.
//!
//! An observer watches a set of key path patterns on one object and is
//! called with the changed paths that affected it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::path;
use super::Object;

/// Unique identifier for an observer.
///
/// Returned by [`Object::add_observer`] and used to remove the observer
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback invoked with the owning object and the changed paths that
/// matched at least one of the observer's patterns.
pub type ObserverFn = Arc<dyn Fn(&Object, &[String]) + Send + Sync>;

/// A registered observer.
pub(crate) struct Observer {
    patterns: Vec<String>,
    callback: ObserverFn,
}

impl Observer {
    pub(crate) fn new(patterns: Vec<String>, callback: ObserverFn) -> Self {
        Self { patterns, callback }
    }

    /// The changed paths that affect this observer, in notification order.
    pub(crate) fn matches<'a, I>(&self, changed: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        changed
            .into_iter()
            .filter(|c| self.patterns.iter().any(|p| path::observes(p, c)))
            .cloned()
            .collect()
    }

    pub(crate) fn callback(&self) -> ObserverFn {
        Arc::clone(&self.callback)
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("patterns", &self.patterns)
            .finish()
    }
}
