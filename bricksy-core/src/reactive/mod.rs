//! Reactive Primitives
//!
//! This module implements the two primitives the store is built on.
//!
//! # Concepts
//!
//! ## Broadcast Cells
//!
//! A [`BroadcastCell`] always holds a value. New observers receive that
//! value immediately; every publication is delivered synchronously to all
//! observers before `publish` returns.
//!
//! ## Selections
//!
//! A [`Selection`] is a derived view over a cell. It maps each published
//! value through a selector and drops emissions its comparator reports as
//! equal to the last one it emitted.
//!
//! # Implementation Notes
//!
//! Handles are `Send + Sync` and cheap to clone. Fan-outs on one cell are
//! serialized; a publication made from inside an observer is queued until
//! the running fan-out finishes (see [`BroadcastCell`]).

mod cell;
mod observable;
mod selector;
mod subscriber;

pub use cell::BroadcastCell;
pub use observable::Observable;
pub use selector::Selection;
pub use subscriber::{SubscriberId, Subscription};
