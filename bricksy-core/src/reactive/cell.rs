//! Broadcast Cell
//!
//! A `BroadcastCell` holds exactly one current value, replays it to every
//! new observer, and fans every later publication out to all observers
//! synchronously, in the order they subscribed.
//!
//! # Reentrancy
//!
//! An observer may publish to the cell that is notifying it. The new value
//! is stored immediately, so `current()` and any later `update` see it, but
//! its notification is queued and delivered once the running fan-out has
//! reached every observer. Queued publications drain in the order they were
//! made, and the call stack never grows with the nesting depth.
//!
//! Every publication carries a version. An observer is handed each version
//! at most once and never one older than the last it saw, so a subscriber
//! that joins while publications are still queued starts from the value it
//! was replayed and skips the queued copies of it.
//!
//! Tasks scheduled with [`BroadcastCell::run_after`] and
//! [`BroadcastCell::update_then`] share the queue, so they run after every
//! publication queued ahead of them has been delivered.
//!
//! Publications from different threads are serialized by a reentrant gate;
//! only the thread that owns the running fan-out can queue into it.
//!
//! # Memory Layout
//!
//! Values are stored behind `Arc`, so a reader may keep an earlier value
//! alive while the cell moves on.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, RwLock};
use smallvec::SmallVec;
use tracing::trace;

use super::observable::Observable;
use super::selector::Selection;
use super::subscriber::{Observer, SubscriberId, Subscription, Unsubscribe};

/// Counter for generating unique cell IDs.
static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_cell_id() -> u64 {
    CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Observer snapshot taken at the start of each fan-out.
type ObserverList<V> = SmallVec<[Arc<Observer<V>>; 8]>;

/// Work run once the publications queued ahead of it are delivered.
type Task = Box<dyn FnOnce() + Send>;

/// A stored value and the version it was published under.
struct Published<V> {
    version: u64,
    value: Arc<V>,
}

impl<V> Clone for Published<V> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            value: Arc::clone(&self.value),
        }
    }
}

enum Job<V> {
    Publish(Published<V>),
    Run(Task),
}

/// State of the fan-out currently running on a cell, if any.
struct Fanout<V> {
    active: bool,
    pending: VecDeque<Job<V>>,
}

impl<V> Default for Fanout<V> {
    fn default() -> Self {
        Self {
            active: false,
            pending: VecDeque::new(),
        }
    }
}

/// Clears the fan-out state when draining ends, including by panic.
struct FanoutReset<'a, V> {
    fanout: &'a RefCell<Fanout<V>>,
}

impl<V> Drop for FanoutReset<'_, V> {
    fn drop(&mut self) {
        let mut fanout = self.fanout.borrow_mut();
        fanout.active = false;
        fanout.pending.clear();
    }
}

struct CellShared<V> {
    id: u64,
    value: RwLock<Published<V>>,
    observers: RwLock<IndexMap<SubscriberId, Arc<Observer<V>>>>,
    gate: ReentrantMutex<RefCell<Fanout<V>>>,
}

impl<V> CellShared<V> {
    fn snapshot_observers(&self) -> ObserverList<V> {
        self.observers.read().values().cloned().collect()
    }

    fn fan_out(&self, published: &Published<V>) {
        let observers = self.snapshot_observers();
        trace!(
            cell = self.id,
            version = published.version,
            observers = observers.len(),
            "fan-out"
        );
        for observer in &observers {
            observer.notify(published.version, &published.value);
        }
    }

    /// Claim the fan-out for this call. `None` means one is already running
    /// further up this thread's stack.
    fn begin<'a>(&self, fanout: &'a RefCell<Fanout<V>>) -> Option<FanoutReset<'a, V>> {
        let mut state = fanout.borrow_mut();
        if state.active {
            trace!(cell = self.id, queued = state.pending.len(), "queued behind fan-out");
            return None;
        }
        state.active = true;
        Some(FanoutReset { fanout })
    }

    fn drain(&self, fanout: &RefCell<Fanout<V>>) {
        loop {
            let job = fanout.borrow_mut().pending.pop_front();
            match job {
                Some(Job::Publish(published)) => self.fan_out(&published),
                Some(Job::Run(task)) => task(),
                None => break,
            }
        }
    }

    fn schedule<I>(&self, jobs: I)
    where
        I: IntoIterator<Item = Job<V>>,
    {
        let gate = self.gate.lock();
        gate.borrow_mut().pending.extend(jobs);
        if let Some(_reset) = self.begin(&gate) {
            self.drain(&gate);
        };
    }
}

impl<V> Unsubscribe for CellShared<V>
where
    V: Send + Sync,
{
    fn unsubscribe(&self, id: SubscriberId) {
        let removed = self.observers.write().shift_remove(&id);
        if let Some(observer) = removed {
            observer.deactivate();
            trace!(cell = self.id, subscriber = %id, "unsubscribed");
        }
    }
}

/// A synchronous single-value publish/subscribe primitive.
///
/// # Example
///
/// ```rust
/// use bricksy_core::reactive::BroadcastCell;
///
/// let cell = BroadcastCell::new(1);
/// let _sub = cell.subscribe(|value| println!("value: {value}"));
/// // prints "value: 1"
///
/// cell.publish(2);
/// // prints "value: 2"
/// assert_eq!(cell.get(), 2);
/// ```
pub struct BroadcastCell<V> {
    shared: Arc<CellShared<V>>,
}

impl<V> BroadcastCell<V>
where
    V: Send + Sync + 'static,
{
    /// Create a cell holding `initial`.
    pub fn new(initial: V) -> Self {
        Self {
            shared: Arc::new(CellShared {
                id: next_cell_id(),
                value: RwLock::new(Published {
                    version: 1,
                    value: Arc::new(initial),
                }),
                observers: RwLock::new(IndexMap::new()),
                gate: ReentrantMutex::new(RefCell::new(Fanout::default())),
            }),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// The latest published value.
    pub fn current(&self) -> Arc<V> {
        Arc::clone(&self.shared.value.read().value)
    }

    /// Replace the value and notify every observer.
    pub fn publish(&self, value: V) {
        self.update(move |_| value);
    }

    /// Compute the next value from the current one and publish it.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&V) -> V,
    {
        let _gate = self.shared.gate.lock();
        let next = self.store_next(f);
        self.shared.schedule([Job::Publish(next)]);
    }

    /// Publish the value `f` computes, then run the task it returns once
    /// that publication has reached every observer.
    ///
    /// Outside a fan-out both happen before this returns. Called from an
    /// observer, both are queued behind the publications already pending.
    pub fn update_then<F, A>(&self, f: F)
    where
        F: FnOnce(&V) -> (V, A),
        A: FnOnce() + Send + 'static,
    {
        let _gate = self.shared.gate.lock();
        let mut task = None;
        let next = self.store_next(|current| {
            let (next, after) = f(current);
            task = Some(after);
            next
        });
        let after = task.map(|after| Job::Run(Box::new(after)));
        self.shared.schedule(std::iter::once(Job::Publish(next)).chain(after));
    }

    /// Run `task` once every publication queued on this thread's fan-out has
    /// been delivered; at once when no fan-out is running.
    pub fn run_after<A>(&self, task: A)
    where
        A: FnOnce() + Send + 'static,
    {
        self.shared.schedule([Job::Run(Box::new(task))]);
    }

    /// Store `f(current)` as the next version. The caller holds the gate.
    fn store_next<F>(&self, f: F) -> Published<V>
    where
        F: FnOnce(&V) -> V,
    {
        let current = self.shared.value.read().clone();
        let next = Published {
            version: current.version + 1,
            value: Arc::new(f(&*current.value)),
        };
        *self.shared.value.write() = next.clone();
        next
    }

    /// Register an observer.
    ///
    /// The observer is called with the current value before this returns,
    /// then with every later publication until the subscription ends. A
    /// publication the observer makes during that first call is queued and
    /// reaches it like any other.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&V) + Send + Sync + 'static,
    {
        let gate = self.shared.gate.lock();

        let id = SubscriberId::new();
        let observer = Arc::new(Observer::new(observer));
        self.shared.observers.write().insert(id, Arc::clone(&observer));
        trace!(cell = self.shared.id, subscriber = %id, "subscribed");

        // Dropped during unwinding if the replay panics.
        let source: Arc<dyn Unsubscribe> = self.shared.clone();
        let subscription = Subscription::from_source(id, &source);

        let replay = self.shared.value.read().clone();
        let claimed = self.shared.begin(&gate);
        observer.notify(replay.version, &replay.value);
        if claimed.is_some() {
            self.shared.drain(&gate);
        }

        subscription
    }

    /// Get the number of observers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.observers.read().len()
    }

    /// Derive a view that emits `selector(value)` whenever it changes.
    ///
    /// Change is detected with `PartialEq`.
    pub fn select<S, F>(&self, selector: F) -> Selection<V, S>
    where
        S: PartialEq + Send + Sync + 'static,
        F: Fn(&V) -> S + Send + Sync + 'static,
    {
        Selection::new(self.clone(), selector)
    }

    /// Derive a view with a custom comparator.
    ///
    /// The comparator returns `true` when two selected values should be
    /// treated as equal, which suppresses the emission.
    pub fn select_with_comparator<S, F, C>(&self, selector: F, comparator: C) -> Selection<V, S>
    where
        S: Send + Sync + 'static,
        F: Fn(&V) -> S + Send + Sync + 'static,
        C: Fn(&S, &S) -> bool + Send + Sync + 'static,
    {
        Selection::with_comparator(self.clone(), selector, comparator)
    }
}

impl<V> BroadcastCell<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Get a clone of the current value.
    pub fn get(&self) -> V {
        V::clone(&self.current())
    }
}

impl<V> Observable for BroadcastCell<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Item = V;

    fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&V) + Send + Sync + 'static,
    {
        BroadcastCell::subscribe(self, observer)
    }

    fn current_item(&self) -> V {
        self.get()
    }
}

impl<V> Clone for BroadcastCell<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V> Debug for BroadcastCell<V>
where
    V: Debug + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastCell")
            .field("id", &self.shared.id)
            .field("value", &self.current())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
