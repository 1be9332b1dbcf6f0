//! Store Directory
//!
//! A [`Directory`] maps names to stores so that parts of an application can
//! find a store without being handed it.
//!
//! Directories are plain values: create one with [`Directory::new`] and pass
//! it where it is needed. [`Directory::global`] is a process-wide instance
//! for code that has no natural place to inject one. Tests that touch the
//! global instance should [`clear`](Directory::clear) it.
//!
//! # Overwrite Semantics
//!
//! Registering a name that is already taken replaces the earlier store and
//! reports that it did so. This is unlike actions and side effects, whose
//! names may only be registered once: a directory entry is a pointer to
//! the current owner of a name, and re-creating a store under the same name
//! (for example after a reload) should take over that name.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::store::Store;

/// A type-erased directory entry.
struct Entry {
    data_type: &'static str,
    store: Arc<dyn Any + Send + Sync>,
}

/// Name-to-store mapping.
#[derive(Default)]
pub struct Directory {
    entries: RwLock<IndexMap<String, Entry>>,
}

static GLOBAL: OnceLock<Directory> = OnceLock::new();

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide directory.
    pub fn global() -> &'static Directory {
        GLOBAL.get_or_init(Directory::new)
    }

    /// Map `name` to `store`, replacing any earlier entry.
    ///
    /// Returns `true` if an earlier entry was replaced.
    pub fn register_store<T, E>(&self, name: impl Into<String>, store: &Store<T, E>) -> bool
    where
        T: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        let name = name.into();
        let entry = Entry {
            data_type: type_name::<T>(),
            store: Arc::new(store.clone()),
        };

        let replaced = self.entries.write().insert(name.clone(), entry);
        match &replaced {
            Some(previous) => warn!(
                store = %name,
                previous = previous.data_type,
                "store name re-registered, replacing earlier store"
            ),
            None => debug!(store = %name, data = type_name::<T>(), "store registered"),
        }
        replaced.is_some()
    }

    /// Create a store named `name` and register it here.
    pub fn create_store<T>(&self, name: impl Into<String>, initial: T) -> Store<T>
    where
        T: Send + Sync + 'static,
    {
        let name = name.into();
        let store = Store::builder().name(name.clone()).build(initial);
        self.register_store(name, &store);
        store
    }

    /// The store registered under `name`.
    ///
    /// `None` if the name is absent or the store has different type
    /// parameters.
    pub fn get<T, E>(&self, name: &str) -> Option<Store<T, E>>
    where
        T: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        let entries = self.entries.read();
        let entry = entries.get(name)?;
        let store = entry.store.downcast_ref::<Store<T, E>>();
        if store.is_none() {
            debug!(
                store = name,
                registered = entry.data_type,
                requested = type_name::<T>(),
                "store lookup with mismatched type"
            );
        }
        store.cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Registered names, in first-registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Remove `name`. Returns whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        self.entries.write().shift_remove(name).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_map()
            .entries(entries.iter().map(|(name, entry)| (name, entry.data_type)))
            .finish()
    }
}

/// Create a store named `name` and register it in [`Directory::global`].
pub fn create_named_store<T>(name: impl Into<String>, initial: T) -> Store<T>
where
    T: Send + Sync + 'static,
{
    Directory::global().create_store(name, initial)
}
