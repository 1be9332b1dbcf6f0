//! Selector Pipeline
//!
//! A [`Selection`] projects part of a cell's value and suppresses
//! emissions that its comparator considers unchanged.
//!
//! # Comparator Convention
//!
//! A comparator returns `true` when the previous and the current selected
//! values should be treated as **equal**. An equal value is not emitted and
//! does not replace the remembered one. This convention holds everywhere in
//! the crate.
//!
//! # Per-Subscriber State
//!
//! Each subscriber keeps its own last emitted value. A new subscriber always
//! receives the currently selected value first, regardless of what other
//! subscribers have seen.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::Mutex;

use super::cell::BroadcastCell;
use super::observable::Observable;
use super::subscriber::Subscription;

type SelectorFn<V, S> = Arc<dyn Fn(&V) -> S + Send + Sync>;
type ComparatorFn<S> = Arc<dyn Fn(&S, &S) -> bool + Send + Sync>;

/// A derived, change-suppressing view over a [`BroadcastCell`].
pub struct Selection<V, S> {
    cell: BroadcastCell<V>,
    selector: SelectorFn<V, S>,
    comparator: ComparatorFn<S>,
}

impl<V, S> Selection<V, S>
where
    V: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    /// Select with `PartialEq` change detection.
    pub fn new<F>(cell: BroadcastCell<V>, selector: F) -> Self
    where
        S: PartialEq,
        F: Fn(&V) -> S + Send + Sync + 'static,
    {
        Self::with_comparator(cell, selector, |prev: &S, curr: &S| prev == curr)
    }

    /// Select with a custom comparator (`true` = equal, suppress).
    pub fn with_comparator<F, C>(cell: BroadcastCell<V>, selector: F, comparator: C) -> Self
    where
        F: Fn(&V) -> S + Send + Sync + 'static,
        C: Fn(&S, &S) -> bool + Send + Sync + 'static,
    {
        Self {
            cell,
            selector: Arc::new(selector),
            comparator: Arc::new(comparator),
        }
    }

    /// The currently selected value, computed from the cell's latest value.
    pub fn get(&self) -> S {
        (self.selector)(&*self.cell.current())
    }

    /// The cell this view reads from.
    pub fn cell(&self) -> &BroadcastCell<V> {
        &self.cell
    }

    /// Register an observer.
    ///
    /// The observer receives the current selection immediately, then every
    /// selected value the comparator reports as changed.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let selector = Arc::clone(&self.selector);
        let comparator = Arc::clone(&self.comparator);
        let last: Mutex<Option<S>> = Mutex::new(None);

        self.cell.subscribe(move |value| {
            let curr = selector(value);
            let mut last = last.lock();
            if let Some(prev) = last.as_ref() {
                if comparator(prev, &curr) {
                    return;
                }
            }
            observer(last.insert(curr));
        })
    }

    /// Narrow this view further.
    ///
    /// The result reads from the same cell and uses `PartialEq` on the
    /// narrowed value.
    pub fn select<U, F>(&self, selector: F) -> Selection<V, U>
    where
        U: PartialEq + Send + Sync + 'static,
        F: Fn(&S) -> U + Send + Sync + 'static,
    {
        let outer = Arc::clone(&self.selector);
        Selection::new(self.cell.clone(), move |value: &V| selector(&outer(value)))
    }
}

impl<V, S> Observable for Selection<V, S>
where
    V: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    type Item = S;

    fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        Selection::subscribe(self, observer)
    }

    fn current_item(&self) -> S {
        self.get()
    }
}

impl<V, S> Clone for Selection<V, S> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            selector: Arc::clone(&self.selector),
            comparator: Arc::clone(&self.comparator),
        }
    }
}

impl<V, S> Debug for Selection<V, S>
where
    V: Send + Sync + 'static,
    S: Debug + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("cell", &self.cell.id())
            .field("selected", &self.get())
            .finish()
    }
}
