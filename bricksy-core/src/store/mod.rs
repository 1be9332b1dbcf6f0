//! The Store
//!
//! This module builds the public state container on top of the reactive
//! primitives.
//!
//! # Concepts
//!
//! ## State
//!
//! A store broadcasts a [`StoreState`]: the application `data` plus an
//! independent `error` and `is_loading` flag. `data` is never mutated in
//! place; every update publishes a new `Arc`.
//!
//! ## Actions and Side Effects
//!
//! An action is a named reducer that computes new data from the current data
//! and a payload. A side effect is a named function that runs with the
//! payload after the reducer's publication. Both are registered once per
//! name and invoked together by [`Store::dispatch`].
//!
//! ## Directory
//!
//! A [`Directory`] maps names to stores for lookup across components.
//!
//! ## Debug Bridge
//!
//! An optional [`DebugBridge`] receives the initial state and the state after
//! every dispatch, for external inspection tools.

mod devtools;
mod directory;
mod patch;
mod registry;
mod state;
#[allow(clippy::module_inception)]
mod store;

pub use devtools::{DebugBridge, JsonLinesBridge, TracingBridge, DEFAULT_BRIDGE_NAME};
pub use directory::{create_named_store, Directory};
pub use patch::Patchable;
pub use registry::{ActionRegistry, Reducer, SideEffect, SideEffectRegistry};
pub use state::StoreState;
pub use store::{create_store, Store, StoreBuilder, StoreSelection};
