//! Bricksy Core
//!
//! This crate provides the engine of the Bricksy reactive state store.
//! It implements:
//!
//! - A synchronous broadcast cell that replays its value to new observers
//! - Selector views that suppress unchanged emissions
//! - Named actions (reducers) and side effects, invoked by `dispatch`
//! - A name-to-store directory
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: the broadcast cell, selections and subscriptions
//! - `store`: the store façade, registries, directory and debug bridge
//!
//! Logging goes through `tracing`; the crate never installs a subscriber.
//!
//! # Example
//!
//! ```rust
//! use bricksy_core::create_store;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! let store = create_store(Counter { count: 0 });
//! let count = store.select_with(|c| c.count);
//! let _sub = count.subscribe(|n| println!("count: {n}"));
//! // prints "count: 0"
//!
//! store.register_action("increment", |c: &Counter, n: &i64| Counter { count: c.count + n })?;
//! store.dispatch("increment", 10_i64)?;
//! // prints "count: 10"
//! # Ok::<(), bricksy_core::StoreError>(())
//! ```

pub mod error;
pub mod reactive;
pub mod store;

pub use error::{BoxError, Result, StoreError};
pub use reactive::{BroadcastCell, Observable, Selection, SubscriberId, Subscription};
pub use store::{
    create_named_store, create_store, DebugBridge, Directory, Patchable, Store, StoreBuilder,
    StoreState,
};
