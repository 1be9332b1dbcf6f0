//! The value a store broadcasts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Full state held by a [`Store`](super::Store).
///
/// `data` is replaced wholesale on every update and never mutated in place,
/// so a clone of the `Arc` stays valid after later updates. `error` and
/// `is_loading` only change through their own store operations.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState<T, E = String> {
    pub data: Arc<T>,
    pub error: Option<E>,
    pub is_loading: bool,
}

impl<T, E> StoreState<T, E> {
    /// State with `data` and no error, not loading.
    pub fn new(data: T) -> Self {
        Self {
            data: Arc::new(data),
            error: None,
            is_loading: false,
        }
    }

    /// Copy of this state with `data` replaced.
    pub(crate) fn with_data(&self, data: Arc<T>) -> Self
    where
        E: Clone,
    {
        Self {
            data,
            error: self.error.clone(),
            is_loading: self.is_loading,
        }
    }

    pub(crate) fn with_error(&self, error: Option<E>) -> Self {
        Self {
            data: Arc::clone(&self.data),
            error,
            is_loading: self.is_loading,
        }
    }

    pub(crate) fn with_loading(&self, is_loading: bool) -> Self
    where
        E: Clone,
    {
        Self {
            data: Arc::clone(&self.data),
            error: self.error.clone(),
            is_loading,
        }
    }
}

impl<T, E: Clone> Clone for StoreState<T, E> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            error: self.error.clone(),
            is_loading: self.is_loading,
        }
    }
}

impl<T: PartialEq, E: PartialEq> PartialEq for StoreState<T, E> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.error == other.error && self.is_loading == other.is_loading
    }
}
