//! Error types for the store engine.
//!
//! Registration errors are surfaced immediately and leave the registry
//! untouched. Dispatching a name nobody registered is not an error.

use thiserror::Error;

/// Boxed error returned by a failing synchronous side effect.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors raised by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An action with this name is already registered on the store.
    #[error("action with the name \"{name}\" is already registered")]
    DuplicateAction { name: String },

    /// A side effect with this name is already registered on the store.
    #[error("side effect with the name \"{name}\" is already registered")]
    DuplicateSideEffect { name: String },

    /// The dispatched payload is not the type the handler was registered with.
    #[error("payload for \"{name}\" has the wrong type, expected `{expected}`")]
    PayloadMismatch {
        name: String,
        expected: &'static str,
    },

    /// A synchronous side effect returned an error.
    #[error("side effect \"{name}\" failed")]
    SideEffect {
        name: String,
        #[source]
        source: BoxError,
    },

    /// An async side effect was dispatched outside of a tokio runtime.
    #[error("async side effect \"{name}\" needs a running tokio runtime")]
    NoAsyncRuntime { name: String },
}

impl StoreError {
    /// The action or side-effect name the error refers to.
    pub fn name(&self) -> &str {
        match self {
            Self::DuplicateAction { name }
            | Self::DuplicateSideEffect { name }
            | Self::PayloadMismatch { name, .. }
            | Self::SideEffect { name, .. }
            | Self::NoAsyncRuntime { name } => name,
        }
    }
}
