//! Shallow merging for [`Store::patch`](super::Store::patch).

use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Data that can absorb a partial update.
///
/// `merge` returns a new value in which every field named by `patch` is
/// replaced and every other field is kept. The merge is one level deep: a
/// nested value named by the patch is replaced wholesale, never merged.
///
/// # Example
///
/// ```rust
/// use bricksy_core::store::Patchable;
///
/// #[derive(Clone)]
/// struct Counter {
///     count: i64,
///     name: String,
/// }
///
/// #[derive(Default)]
/// struct CounterPatch {
///     count: Option<i64>,
///     name: Option<String>,
/// }
///
/// impl Patchable for Counter {
///     type Patch = CounterPatch;
///
///     fn merge(&self, patch: CounterPatch) -> Self {
///         Self {
///             count: patch.count.unwrap_or(self.count),
///             name: patch.name.unwrap_or_else(|| self.name.clone()),
///         }
///     }
/// }
/// ```
pub trait Patchable: Sized {
    /// The partial form of `Self`.
    type Patch;

    /// Apply `patch` on top of `self`.
    fn merge(&self, patch: Self::Patch) -> Self;
}

/// JSON objects merge key by key. Merging onto a non-object replaces it.
impl Patchable for Value {
    type Patch = Map<String, Value>;

    fn merge(&self, patch: Self::Patch) -> Self {
        match self {
            Value::Object(current) => {
                let mut merged = current.clone();
                merged.extend(patch);
                Value::Object(merged)
            }
            _ => Value::Object(patch),
        }
    }
}

impl<K, V, S> Patchable for IndexMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    type Patch = IndexMap<K, V, S>;

    fn merge(&self, patch: Self::Patch) -> Self {
        let mut merged = self.clone();
        merged.extend(patch);
        merged
    }
}

impl<K, V, S> Patchable for HashMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    type Patch = HashMap<K, V, S>;

    fn merge(&self, patch: Self::Patch) -> Self {
        let mut merged = self.clone();
        merged.extend(patch);
        merged
    }
}
