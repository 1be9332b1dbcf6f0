//! Action and side-effect registries.
//!
//! Both registries map a name to exactly one handler for the lifetime of the
//! store. A second registration under an existing name fails and leaves the
//! original in place; there is no unregistration.
//!
//! Handlers are stored type-erased together with the name of the payload
//! type they accept. A lookup names the payload type it has and gets the
//! typed handler back; it never fails, and a handler registered for another
//! payload type is simply not found. `check` reports such a mismatch as
//! [`StoreError::PayloadMismatch`] for callers that want to reject it.

use std::any::{type_name, Any};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{BoxError, Result, StoreError};

/// A reducer bound to an action name: computes the next data from the
/// current data and the dispatched payload.
pub type Reducer<T, P> = dyn Fn(&T, &P) -> T + Send + Sync;

/// A side effect bound to a name, already wrapped so that failures carry the
/// effect's name.
pub type SideEffect<P> = dyn Fn(&P) -> Result<()> + Send + Sync;

/// One registered handler with its payload type erased.
struct Entry {
    payload_type: &'static str,
    handler: Box<dyn Any + Send + Sync>,
}

impl Entry {
    fn new<H>(payload_type: &'static str, handler: H) -> Self
    where
        H: Any + Send + Sync,
    {
        Self {
            payload_type,
            handler: Box::new(handler),
        }
    }

    fn typed<H>(&self) -> Option<H>
    where
        H: Any + Clone,
    {
        self.handler.downcast_ref::<H>().cloned()
    }
}

/// Name-unique, insertion-ordered handler table shared by both registries.
#[derive(Default)]
struct Registry {
    entries: IndexMap<String, Entry>,
}

impl Registry {
    /// Insert unless `name` is taken. Returns whether the entry was added.
    fn insert(&mut self, name: String, entry: Entry) -> bool {
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, entry);
        true
    }

    fn get<H>(&self, name: &str) -> Option<H>
    where
        H: Any + Clone,
    {
        self.entries.get(name).and_then(Entry::typed::<H>)
    }

    /// Fails only when `name` holds a handler of a type other than `H`.
    fn check<H: Any>(&self, name: &str) -> Result<()> {
        match self.entries.get(name) {
            Some(entry) if !entry.handler.is::<H>() => Err(StoreError::PayloadMismatch {
                name: name.to_string(),
                expected: entry.payload_type,
            }),
            _ => Ok(()),
        }
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, entry)| (name, entry.payload_type)))
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Actions
// ----------------------------------------------------------------------------

/// Maps action names to reducers over data of type `T`.
pub struct ActionRegistry<T> {
    registry: Registry,
    _data: PhantomData<fn(&T) -> T>,
}

impl<T: 'static> ActionRegistry<T> {
    pub fn new() -> Self {
        Self {
            registry: Registry::default(),
            _data: PhantomData,
        }
    }

    /// Bind `name` to `reducer`.
    ///
    /// Fails with [`StoreError::DuplicateAction`] if the name is taken; the
    /// existing reducer is kept.
    pub fn register<P, F>(&mut self, name: impl Into<String>, reducer: F) -> Result<()>
    where
        P: Any,
        F: Fn(&T, &P) -> T + Send + Sync + 'static,
    {
        let name = name.into();
        let reducer: Arc<Reducer<T, P>> = Arc::new(reducer);
        let entry = Entry::new(type_name::<P>(), reducer);
        if !self.registry.insert(name.clone(), entry) {
            return Err(StoreError::DuplicateAction { name });
        }
        debug!(action = %name, payload = type_name::<P>(), "action registered");
        Ok(())
    }

    /// The reducer registered under `name` for payloads of type `P`, if any.
    pub fn lookup<P: Any>(&self, name: &str) -> Option<Arc<Reducer<T, P>>> {
        self.registry.get(name)
    }

    /// Fails with [`StoreError::PayloadMismatch`] when `name` is bound to a
    /// reducer for a payload type other than `P`.
    pub fn check<P: Any>(&self, name: &str) -> Result<()> {
        self.registry.check::<Arc<Reducer<T, P>>>(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.entries.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registry.names()
    }

    pub fn len(&self) -> usize {
        self.registry.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.entries.is_empty()
    }
}

impl<T: 'static> Default for ActionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ActionRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionRegistry").field(&self.registry).finish()
    }
}

// ----------------------------------------------------------------------------
// Side effects
// ----------------------------------------------------------------------------

/// Maps side-effect names to effect functions.
///
/// Independent of [`ActionRegistry`]: an action and a side effect may share
/// a name, and both run on one dispatch.
#[derive(Debug, Default)]
pub struct SideEffectRegistry {
    registry: Registry,
}

impl SideEffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a synchronous effect.
    ///
    /// An error returned by the effect reaches the dispatch caller as
    /// [`StoreError::SideEffect`].
    pub fn register<P, F>(&mut self, name: impl Into<String>, effect: F) -> Result<()>
    where
        P: Any,
        F: Fn(&P) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let effect_name = name.clone();
        self.insert(name, move |payload: &P| {
            effect(payload).map_err(|source| StoreError::SideEffect {
                name: effect_name.clone(),
                source,
            })
        })
    }

    /// Bind `name` to an effect that returns a future.
    ///
    /// On dispatch the future is spawned on the current tokio runtime and
    /// not awaited. Dispatching outside a runtime fails with
    /// [`StoreError::NoAsyncRuntime`]. Failures inside the future are the
    /// effect's own to report.
    pub fn register_async<P, F, Fut>(&mut self, name: impl Into<String>, effect: F) -> Result<()>
    where
        P: Any,
        F: Fn(&P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let effect_name = name.clone();
        self.insert(name, move |payload: &P| {
            let handle = tokio::runtime::Handle::try_current().map_err(|_| {
                StoreError::NoAsyncRuntime {
                    name: effect_name.clone(),
                }
            })?;
            handle.spawn(effect(payload));
            debug!(side_effect = %effect_name, "async side effect spawned");
            Ok(())
        })
    }

    fn insert<P, F>(&mut self, name: String, effect: F) -> Result<()>
    where
        P: Any,
        F: Fn(&P) -> Result<()> + Send + Sync + 'static,
    {
        let effect: Arc<SideEffect<P>> = Arc::new(effect);
        let entry = Entry::new(type_name::<P>(), effect);
        if !self.registry.insert(name.clone(), entry) {
            return Err(StoreError::DuplicateSideEffect { name });
        }
        debug!(side_effect = %name, payload = type_name::<P>(), "side effect registered");
        Ok(())
    }

    /// The effect registered under `name` for payloads of type `P`, if any.
    pub fn lookup<P: Any>(&self, name: &str) -> Option<Arc<SideEffect<P>>> {
        self.registry.get(name)
    }

    /// Fails with [`StoreError::PayloadMismatch`] when `name` is bound to an
    /// effect for a payload type other than `P`.
    pub fn check<P: Any>(&self, name: &str) -> Result<()> {
        self.registry.check::<Arc<SideEffect<P>>>(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.entries.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registry.names()
    }

    pub fn len(&self) -> usize {
        self.registry.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.entries.is_empty()
    }
}
