//! Debug bridge
//!
//! An inspection tool can watch a store by implementing [`DebugBridge`] and
//! passing it to [`StoreBuilder::debug_bridge`](super::StoreBuilder::debug_bridge).
//! The store calls [`init`](DebugBridge::init) once when it is built and
//! [`send`](DebugBridge::send) after every dispatch that reached a handler.
//! A dispatch that ran a side effect reports it through
//! [`side_effect`](DebugBridge::side_effect) just before its `send`.
//! A store built without a bridge makes no calls at all.

use std::fmt::Debug;
use std::io::Write;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use super::state::StoreState;

/// Connection name used when a bridge is not given one.
pub const DEFAULT_BRIDGE_NAME: &str = "bricksy-store";

/// Receives `(action, state)` pairs for external inspection.
///
/// Implementations must not fail the dispatch that feeds them; report
/// problems out of band.
pub trait DebugBridge<T, E>: Send + Sync {
    /// Called once with the store's initial state.
    fn init(&self, state: &StoreState<T, E>);

    /// Called after a dispatch of `action` with the resulting state.
    fn send(&self, action: &str, state: &StoreState<T, E>);

    /// Called when the side effect registered under `action` has run.
    fn side_effect(&self, _action: &str) {}
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Message<'a, T, E> {
    Init {
        store: &'a str,
        state: &'a StoreState<T, E>,
    },
    Action {
        store: &'a str,
        action: &'a str,
        state: &'a StoreState<T, E>,
    },
    SideEffect {
        store: &'a str,
        action: &'a str,
    },
}

/// Writes one JSON object per line to `W`.
///
/// ```text
/// {"type":"init","store":"bricksy-store","state":{"data":…,"error":null,"isLoading":false}}
/// {"type":"sideEffect","store":"bricksy-store","action":"save"}
/// {"type":"action","store":"bricksy-store","action":"increment","state":{…}}
/// ```
pub struct JsonLinesBridge<W> {
    name: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesBridge<W> {
    pub fn new(writer: W) -> Self {
        Self::named(DEFAULT_BRIDGE_NAME, writer)
    }

    pub fn named(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(writer),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take the writer back.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write<T, E>(&self, message: &Message<'_, T, E>)
    where
        T: Serialize,
        E: Serialize,
    {
        let mut writer = self.writer.lock();
        let result = serde_json::to_writer(&mut *writer, message)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush());
        if let Err(error) = result {
            warn!(bridge = %self.name, %error, "debug bridge write failed");
        }
    }
}

impl<T, E, W> DebugBridge<T, E> for JsonLinesBridge<W>
where
    T: Serialize,
    E: Serialize,
    W: Write + Send,
{
    fn init(&self, state: &StoreState<T, E>) {
        self.write(&Message::Init {
            store: &self.name,
            state,
        });
    }

    fn send(&self, action: &str, state: &StoreState<T, E>) {
        self.write(&Message::Action {
            store: &self.name,
            action,
            state,
        });
    }

    fn side_effect(&self, action: &str) {
        self.write::<T, E>(&Message::SideEffect {
            store: &self.name,
            action,
        });
    }
}

/// Reports every dispatch as an `info` tracing event.
#[derive(Debug, Clone)]
pub struct TracingBridge {
    name: String,
}

impl TracingBridge {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for TracingBridge {
    fn default() -> Self {
        Self::new(DEFAULT_BRIDGE_NAME)
    }
}

impl<T: Debug, E: Debug> DebugBridge<T, E> for TracingBridge {
    fn init(&self, state: &StoreState<T, E>) {
        info!(bridge = %self.name, ?state, "store initialized");
    }

    fn send(&self, action: &str, state: &StoreState<T, E>) {
        info!(bridge = %self.name, action, ?state, "action dispatched");
    }

    fn side_effect(&self, action: &str) {
        info!(bridge = %self.name, action, "side effect ran");
    }
}
