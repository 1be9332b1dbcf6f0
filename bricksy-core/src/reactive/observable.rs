//! The observation seam shared by cells and selections.

use super::subscriber::Subscription;

/// A source of values that replays its current value to new observers.
///
/// Both [`BroadcastCell`](super::BroadcastCell) and
/// [`Selection`](super::Selection) implement this, so consumers can accept
/// either.
pub trait Observable {
    /// The type of value delivered to observers.
    type Item;

    /// Register an observer.
    ///
    /// The observer is called once with the current value before this
    /// returns, then once per later emission until the subscription ends.
    fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Self::Item) + Send + Sync + 'static;

    /// Read the current value without subscribing.
    fn current_item(&self) -> Self::Item;
}
