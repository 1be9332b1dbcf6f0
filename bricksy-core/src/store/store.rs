//! Store Implementation
//!
//! A [`Store`] composes one broadcast cell holding a [`StoreState`], an
//! action registry and a side-effect registry behind a single handle.
//!
//! # Dispatch
//!
//! `dispatch(name, payload)` looks up an action and a side effect under
//! `name` independently:
//!
//! 1. If an action is registered, its reducer runs through `update_data`,
//!    which is exactly one publication.
//! 2. If a side effect is registered, it runs with the raw payload after
//!    that publication has reached every subscriber.
//! 3. If a debug bridge is configured, it hears about the side effect and
//!    receives the state the reducer published.
//!
//! A dispatch made from a subscriber queues behind the fan-out that is
//! notifying it, so nested dispatches settle in the order they were made.
//!
//! A name with neither handler is a silent no-op. Payload types are checked
//! against both handlers before anything runs.

use std::any::Any;
use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use super::devtools::DebugBridge;
use super::patch::Patchable;
use super::registry::{ActionRegistry, SideEffect, SideEffectRegistry};
use super::state::StoreState;
use crate::error::{BoxError, Result};
use crate::reactive::{BroadcastCell, Selection, Subscription};

/// A selection over a store's state.
pub type StoreSelection<T, E, S> = Selection<StoreState<T, E>, S>;

struct StoreInner<T, E> {
    name: Option<String>,
    cell: BroadcastCell<StoreState<T, E>>,
    actions: RwLock<ActionRegistry<T>>,
    side_effects: RwLock<SideEffectRegistry>,
    bridge: Option<Arc<dyn DebugBridge<T, E>>>,
}

/// The reactive state container.
///
/// Cloning a `Store` yields another handle to the same state and registries.
///
/// # Example
///
/// ```rust
/// use bricksy_core::create_store;
///
/// let store = create_store(0_i64);
/// store.register_action("increment", |count: &i64, n: &i64| count + n)?;
///
/// store.dispatch("increment", 10_i64)?;
/// assert_eq!(*store.snapshot(), 10);
/// # Ok::<(), bricksy_core::StoreError>(())
/// ```
pub struct Store<T, E = String> {
    inner: Arc<StoreInner<T, E>>,
}

impl<T, E> Store<T, E>
where
    T: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an unnamed store without a debug bridge.
    pub fn new(initial: T) -> Self {
        Self::builder().build(initial)
    }

    /// Configure a store before creating it.
    pub fn builder() -> StoreBuilder<T, E> {
        StoreBuilder::new()
    }

    /// The name given at construction, if any.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Replace `data` with `value`.
    pub fn set_data(&self, value: T) {
        let data = Arc::new(value);
        self.publish(|state| state.with_data(data));
    }

    /// Replace `data` with `f(current data)`.
    pub fn update_data<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.publish(|state| state.with_data(Arc::new(f(&*state.data))));
    }

    /// Shallow-merge `partial` into `data`.
    ///
    /// Fields the patch does not name keep their values; nested values the
    /// patch names are replaced wholesale.
    pub fn patch(&self, partial: T::Patch)
    where
        T: Patchable,
    {
        self.update_data(|data| data.merge(partial));
    }

    /// Replace `error`, leaving `data` and `is_loading` untouched.
    pub fn set_error(&self, error: Option<E>) {
        self.publish(|state| state.with_error(error));
    }

    /// Replace `is_loading`, leaving `data` and `error` untouched.
    pub fn set_is_loading(&self, is_loading: bool) {
        self.publish(|state| state.with_loading(is_loading));
    }

    fn publish<F>(&self, next: F)
    where
        F: FnOnce(&StoreState<T, E>) -> StoreState<T, E>,
    {
        trace!(store = self.name(), "publish");
        self.inner.cell.update(next);
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    /// The current data, without subscribing.
    pub fn snapshot(&self) -> Arc<T> {
        Arc::clone(&self.inner.cell.current().data)
    }

    /// The full current state, without subscribing.
    pub fn get_value(&self) -> StoreState<T, E> {
        self.inner.cell.get()
    }

    /// Observe the full state. Every publication is delivered.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&StoreState<T, E>) + Send + Sync + 'static,
    {
        self.inner.cell.subscribe(observer)
    }

    /// View of `data`; the same as [`data`](Self::data).
    pub fn select(&self) -> StoreSelection<T, E, Arc<T>> {
        self.data()
    }

    /// View of part of `data`, emitting when it changes by `PartialEq`.
    pub fn select_with<S, F>(&self, selector: F) -> StoreSelection<T, E, S>
    where
        S: PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        self.inner.cell.select(move |state| selector(&*state.data))
    }

    /// View of part of `data` with a custom comparator.
    ///
    /// The comparator returns `true` when the values are equal, which
    /// suppresses the emission.
    pub fn select_with_comparator<S, F, C>(
        &self,
        selector: F,
        comparator: C,
    ) -> StoreSelection<T, E, S>
    where
        S: Send + Sync + 'static,
        F: Fn(&T) -> S + Send + Sync + 'static,
        C: Fn(&S, &S) -> bool + Send + Sync + 'static,
    {
        self.inner
            .cell
            .select_with_comparator(move |state| selector(&*state.data), comparator)
    }

    /// View of `data`.
    ///
    /// Emits whenever `data` is replaced, compared by `Arc` identity, so a
    /// structurally equal replacement still emits.
    pub fn data(&self) -> StoreSelection<T, E, Arc<T>> {
        self.inner.cell.select_with_comparator(
            |state| Arc::clone(&state.data),
            |prev: &Arc<T>, curr: &Arc<T>| Arc::ptr_eq(prev, curr),
        )
    }

    /// View of `error`.
    pub fn error(&self) -> StoreSelection<T, E, Option<E>>
    where
        E: PartialEq,
    {
        self.inner.cell.select(|state| state.error.clone())
    }

    /// View of `is_loading`.
    pub fn is_loading(&self) -> StoreSelection<T, E, bool> {
        self.inner.cell.select(|state| state.is_loading)
    }

    // ------------------------------------------------------------------
    // Registration and dispatch
    // ------------------------------------------------------------------

    /// Bind `name` to a reducer taking payloads of type `P`.
    ///
    /// Fails with [`StoreError::DuplicateAction`](crate::StoreError::DuplicateAction)
    /// if the name is taken; the store is otherwise unaffected.
    pub fn register_action<P, F>(&self, name: impl Into<String>, reducer: F) -> Result<()>
    where
        P: Any,
        F: Fn(&T, &P) -> T + Send + Sync + 'static,
    {
        self.inner.actions.write().register(name, reducer)
    }

    /// Bind `name` to a synchronous side effect taking payloads of type `P`.
    ///
    /// Fails with
    /// [`StoreError::DuplicateSideEffect`](crate::StoreError::DuplicateSideEffect)
    /// if the name is taken.
    pub fn register_side_effect<P, F>(&self, name: impl Into<String>, effect: F) -> Result<()>
    where
        P: Any,
        F: Fn(&P) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.inner.side_effects.write().register(name, effect)
    }

    /// Bind `name` to a side effect whose work is a future.
    ///
    /// The future is spawned on the current tokio runtime when dispatched;
    /// `dispatch` does not wait for it.
    pub fn register_async_side_effect<P, F, Fut>(
        &self,
        name: impl Into<String>,
        effect: F,
    ) -> Result<()>
    where
        P: Any,
        F: Fn(&P) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.inner.side_effects.write().register_async(name, effect)
    }

    /// Whether an action is registered under `name`.
    pub fn has_action(&self, name: &str) -> bool {
        self.inner.actions.read().contains(name)
    }

    /// Whether a side effect is registered under `name`.
    pub fn has_side_effect(&self, name: &str) -> bool {
        self.inner.side_effects.read().contains(name)
    }

    /// Run the action and then the side effect registered under `name`.
    ///
    /// Either, both or neither may exist. The side effect's synchronous error
    /// is returned after the reducer has already been applied.
    ///
    /// Called from inside a subscriber of this store, the reducer's value is
    /// stored at once but its publication, the side effect and the bridge
    /// report are queued behind the fan-out in progress. The side effect's
    /// error can then no longer be returned and is logged instead.
    pub fn dispatch<P>(&self, name: &str, payload: P) -> Result<()>
    where
        P: Any + Send,
    {
        let (reducer, effect) = {
            let actions = self.inner.actions.read();
            let side_effects = self.inner.side_effects.read();
            actions.check::<P>(name)?;
            side_effects.check::<P>(name)?;
            (actions.lookup::<P>(name), side_effects.lookup::<P>(name))
        };

        debug!(
            store = self.name(),
            action = name,
            reducer = reducer.is_some(),
            side_effect = effect.is_some(),
            "dispatch"
        );

        if reducer.is_none() && effect.is_none() {
            return Ok(());
        }

        let outcome = Arc::new(Mutex::new(None));
        let report = Arc::downgrade(&outcome);
        let store = self.clone();
        let action = name.to_string();
        let finish = move |payload: P, state: Option<StoreState<T, E>>| {
            let result = store.settle(&action, effect.as_deref(), &payload, state);
            match report.upgrade() {
                Some(slot) => *slot.lock() = Some(result),
                None => {
                    if let Err(error) = result {
                        warn!(
                            store = store.name(),
                            action = %action,
                            %error,
                            "queued side effect failed"
                        );
                    }
                }
            }
        };

        match reducer {
            Some(reducer) => self.inner.cell.update_then(move |state| {
                let next = state.with_data(Arc::new(reducer(&*state.data, &payload)));
                let reported = next.clone();
                (next, move || finish(payload, Some(reported)))
            }),
            None => self.inner.cell.run_after(move || finish(payload, None)),
        }

        let result = outcome.lock().take();
        result.unwrap_or(Ok(()))
    }

    /// Run the side effect and report to the bridge. `state` is the state
    /// the reducer published, if one ran.
    fn settle<P>(
        &self,
        action: &str,
        effect: Option<&SideEffect<P>>,
        payload: &P,
        state: Option<StoreState<T, E>>,
    ) -> Result<()> {
        let outcome = match effect {
            Some(effect) => effect(payload),
            None => Ok(()),
        };

        if let Some(bridge) = &self.inner.bridge {
            if effect.is_some() {
                bridge.side_effect(action);
            }
            let state = state.unwrap_or_else(|| self.get_value());
            bridge.send(action, &state);
        }

        outcome
    }
}

impl<T, E> Clone for Store<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> Debug for Store<T, E>
where
    T: Debug + Send + Sync + 'static,
    E: Debug + Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.name)
            .field("state", &self.inner.cell.current())
            .field("actions", &*self.inner.actions.read())
            .field("side_effects", &*self.inner.side_effects.read())
            .field("debug_bridge", &self.inner.bridge.is_some())
            .finish()
    }
}

/// Create an unnamed store holding `initial`.
pub fn create_store<T>(initial: T) -> Store<T>
where
    T: Send + Sync + 'static,
{
    Store::new(initial)
}

// ----------------------------------------------------------------------------
// Builder
// ----------------------------------------------------------------------------

/// Options for a new [`Store`].
pub struct StoreBuilder<T, E = String> {
    name: Option<String>,
    bridge: Option<Arc<dyn DebugBridge<T, E>>>,
}

impl<T, E> StoreBuilder<T, E>
where
    T: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            name: None,
            bridge: None,
        }
    }

    /// Name the store. Names label log events and bridge traffic; they are
    /// not registered anywhere by the builder.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a debug bridge.
    pub fn debug_bridge<B>(self, bridge: B) -> Self
    where
        B: DebugBridge<T, E> + 'static,
    {
        self.shared_debug_bridge(Arc::new(bridge))
    }

    /// Attach a debug bridge that is shared with other owners.
    pub fn shared_debug_bridge(mut self, bridge: Arc<dyn DebugBridge<T, E>>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Create the store. A configured bridge receives `init` here.
    pub fn build(self, initial: T) -> Store<T, E> {
        let state = StoreState::new(initial);
        if let Some(bridge) = &self.bridge {
            bridge.init(&state);
        }
        debug!(store = self.name.as_deref(), "store created");

        Store {
            inner: Arc::new(StoreInner {
                name: self.name,
                cell: BroadcastCell::new(state),
                actions: RwLock::new(ActionRegistry::new()),
                side_effects: RwLock::new(SideEffectRegistry::new()),
                bridge: self.bridge,
            }),
        }
    }
}

impl<T, E> Default for StoreBuilder<T, E>
where
    T: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
