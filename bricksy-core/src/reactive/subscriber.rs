//! Subscriber identity and subscription handles.
//!
//! Every observer registered on a broadcast cell gets a [`SubscriberId`].
//! The [`Subscription`] returned to the caller owns that registration and
//! removes it when dropped.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Unique identifier for a subscriber.
///
/// Generated from a process-wide atomic counter, so ids are unique across
/// cells and threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Something an observer can be removed from.
///
/// Implemented by the shared state behind a broadcast cell so that a
/// [`Subscription`] can detach itself without knowing the value type.
pub(crate) trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: SubscriberId);
}

/// The callback slot for one observer.
///
/// The `active` flag is cleared on unsubscribe; a fan-out that already
/// snapshotted the observer list checks it before every call.
///
/// `seen` is the highest publication version delivered so far. A value is
/// delivered at most once and never after a newer one.
pub(crate) struct Observer<V> {
    active: AtomicBool,
    seen: AtomicU64,
    callback: Box<dyn Fn(&V) + Send + Sync>,
}

impl<V> Observer<V> {
    pub(crate) fn new<F>(callback: F) -> Self
    where
        F: Fn(&V) + Send + Sync + 'static,
    {
        Self {
            active: AtomicBool::new(true),
            seen: AtomicU64::new(0),
            callback: Box::new(callback),
        }
    }

    pub(crate) fn notify(&self, version: u64, value: &V) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        if self.seen.fetch_max(version, Ordering::AcqRel) >= version {
            return;
        }
        (self.callback)(value);
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Handle for one observer registration.
///
/// Dropping the handle unsubscribes the observer. After
/// [`unsubscribe`](Self::unsubscribe) returns (or the handle is dropped) the
/// observer is never invoked again, even by a fan-out already in progress.
#[must_use = "dropping a Subscription immediately unsubscribes the observer"]
pub struct Subscription {
    id: SubscriberId,
    source: Option<Weak<dyn Unsubscribe>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, source: Weak<dyn Unsubscribe>) -> Self {
        Self {
            id,
            source: Some(source),
        }
    }

    pub(crate) fn from_source(id: SubscriberId, source: &Arc<dyn Unsubscribe>) -> Self {
        Self::new(id, Arc::downgrade(source))
    }

    /// The id of the observer this handle owns.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the observer now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the observer registered for the lifetime of its source.
    pub fn detach(mut self) {
        self.source = None;
    }

    /// Whether this handle still owns a live registration.
    pub fn is_active(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.strong_count() > 0)
    }

    fn release(&mut self) {
        if let Some(source) = self.source.take().and_then(|weak| weak.upgrade()) {
            source.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
