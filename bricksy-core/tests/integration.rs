//! Integration Tests for the Store
//!
//! These tests drive stores through the public API only.

use std::io::Write;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use bricksy_core::store::JsonLinesBridge;
use bricksy_core::{create_named_store, create_store, Directory, Store, StoreError};

#[derive(Debug, Clone, PartialEq)]
struct Counter {
    count: i64,
    name: String,
}

fn bricksy() -> Counter {
    Counter {
        count: 0,
        name: "Bricksy".to_string(),
    }
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("test patch must be an object")
}

fn collect<S>() -> (Arc<Mutex<Vec<S>>>, impl Fn(&S) + Send + Sync + 'static)
where
    S: Clone + Send + 'static,
{
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |value: &S| sink.lock().push(value.clone()))
}

/// A new subscriber to the data view sees the current data before anything
/// else happens.
#[test]
fn subscription_receives_current_data_immediately() {
    let store = create_store(bricksy());
    store.set_data(Counter {
        count: 3,
        name: "Brisky".into(),
    });

    let (seen, observer) = collect::<Arc<Counter>>();
    let _sub = store.select().subscribe(observer);

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].count, 3);
}

/// A selection over part of the data replays the current selected value.
#[test]
fn selection_receives_current_selection_immediately() {
    let store = create_store(bricksy());

    let (seen, observer) = collect::<i64>();
    let _sub = store.select_with(|c| c.count).subscribe(observer);

    assert_eq!(*seen.lock(), vec![0]);
}

/// Dispatching a registered action leaves exactly `reducer(d0, payload)`.
#[test]
fn dispatch_applies_reducer_to_current_data() {
    let store = create_store(bricksy());
    store
        .register_action("rename", |c: &Counter, name: &String| Counter {
            name: name.clone(),
            ..c.clone()
        })
        .unwrap();

    store.dispatch("rename", "Brisky".to_string()).unwrap();

    assert_eq!(
        *store.snapshot(),
        Counter {
            count: 0,
            name: "Brisky".into()
        }
    );
}

/// Sequential dispatches compose left to right.
#[test]
fn sequential_dispatches_compose() {
    let store = create_store(json!({ "count": 0 }));
    store
        .register_action("increment", |state: &Value, n: &i64| {
            json!({ "count": state["count"].as_i64().unwrap_or(0) + n })
        })
        .unwrap();
    store
        .register_action("decrement", |state: &Value, n: &i64| {
            json!({ "count": state["count"].as_i64().unwrap_or(0) - n })
        })
        .unwrap();

    store.dispatch("increment", 10_i64).unwrap();
    store.dispatch("decrement", 3_i64).unwrap();

    assert_eq!(*store.snapshot(), json!({ "count": 7 }));
}

/// A second registration under the same name fails and changes nothing.
#[test]
fn duplicate_registrations_fail_without_side_effects() {
    let store = create_store(bricksy());
    let effect_calls = Arc::new(AtomicI32::new(0));

    store
        .register_action("bump", |c: &Counter, _: &()| Counter {
            count: c.count + 1,
            ..c.clone()
        })
        .unwrap();
    let calls = effect_calls.clone();
    store
        .register_side_effect("bump", move |_: &()| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    let before = store.snapshot();

    let action_err = store
        .register_action("bump", |c: &Counter, _: &()| Counter {
            count: c.count + 100,
            ..c.clone()
        })
        .unwrap_err();
    let effect_err = store
        .register_side_effect("bump", |_: &()| Err("never registered".into()))
        .unwrap_err();

    assert!(matches!(action_err, StoreError::DuplicateAction { .. }));
    assert!(matches!(effect_err, StoreError::DuplicateSideEffect { .. }));
    assert!(Arc::ptr_eq(&before, &store.snapshot()));

    store.dispatch("bump", ()).unwrap();
    assert_eq!(store.snapshot().count, 1);
    assert_eq!(effect_calls.load(Ordering::SeqCst), 1);
}

/// Dispatching one side effect never runs another.
#[test]
fn side_effects_are_isolated_by_name() {
    let store = create_store(bricksy());
    let log = Arc::new(Mutex::new(Vec::new()));

    let log_sink = log.clone();
    store
        .register_side_effect("log", move |msg: &String| {
            log_sink.lock().push(format!("log: {msg}"));
            Ok(())
        })
        .unwrap();
    let notify_sink = log.clone();
    store
        .register_side_effect("notify", move |msg: &String| {
            notify_sink.lock().push(format!("notify: {msg}"));
            Ok(())
        })
        .unwrap();

    store.dispatch("log", "hello".to_string()).unwrap();
    store.dispatch("notify", "world".to_string()).unwrap();

    assert_eq!(*log.lock(), vec!["log: hello", "notify: world"]);
}

/// An action and a side effect sharing a name both fire on one dispatch,
/// reducer first.
#[test]
fn action_and_side_effect_share_a_name() {
    let store = create_store(bricksy());
    let seen_by_effect = Arc::new(AtomicI32::new(-1));

    store
        .register_action("set", |c: &Counter, n: &i64| Counter {
            count: *n,
            ..c.clone()
        })
        .unwrap();
    let effect_store = store.clone();
    let seen = seen_by_effect.clone();
    store
        .register_side_effect("set", move |_: &i64| {
            seen.store(effect_store.snapshot().count as i32, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    store.dispatch("set", 12_i64).unwrap();

    assert_eq!(seen_by_effect.load(Ordering::SeqCst), 12);
}

/// Unknown dispatch targets are a silent no-op.
#[test]
fn dispatching_an_unknown_name_does_nothing() {
    let store = create_store(bricksy());
    let (seen, observer) = collect::<Arc<Counter>>();
    let _sub = store.data().subscribe(observer);

    store.dispatch("missing", 1_i64).unwrap();

    assert_eq!(seen.lock().len(), 1);
}

/// A subscriber added from inside another subscriber sees each state once.
#[test]
fn subscriber_added_during_dispatch_sees_each_state_once() {
    let store: Store<i64> = Store::new(0);
    store.register_action("set", |_: &i64, n: &i64| *n).unwrap();

    let (seen, observer) = collect::<i64>();
    let observer = Arc::new(Mutex::new(Some(observer)));
    let late = Arc::new(Mutex::new(None));

    let chained = store.clone();
    let late_slot = late.clone();
    let _trigger = store.subscribe(move |state| {
        if *state.data == 1 {
            chained.dispatch("set", 2_i64).unwrap();
            if let Some(observer) = observer.lock().take() {
                let sub = chained.subscribe(move |state| observer(&*state.data));
                *late_slot.lock() = Some(sub);
            }
        }
    });

    store.dispatch("set", 1_i64).unwrap();
    store.dispatch("set", 3_i64).unwrap();

    assert_eq!(*seen.lock(), vec![2, 3]);
}

/// Selecting `count` ignores changes to `name`.
#[test]
fn default_comparator_suppresses_equal_selections() {
    let store = create_store(json!({ "count": 0, "name": "Bricksy" }));
    let (seen, observer) = collect::<Value>();
    let _sub = store
        .select_with(|state: &Value| state["count"].clone())
        .subscribe(observer);

    store.patch(object(json!({ "name": "Brisky" })));
    store.patch(object(json!({ "name": "BriskY" })));
    store.patch(object(json!({ "count": 1 })));
    store.patch(object(json!({ "count": 1 })));

    assert_eq!(*seen.lock(), vec![json!(0), json!(1)]);
}

/// A case-insensitive comparator collapses case-only changes.
#[test]
fn custom_comparator_changes_emission_cadence() {
    let store = create_store(json!({ "count": 0, "name": "Bricksy" }));
    let (seen, observer) = collect::<String>();
    let _sub = store
        .select_with_comparator(
            |state: &Value| state["name"].as_str().unwrap_or_default().to_string(),
            |prev: &String, curr: &String| prev.to_lowercase() == curr.to_lowercase(),
        )
        .subscribe(observer);

    for name in ["Bricksy", "brisky", "BriskY", "Bricksy"] {
        store.patch(object(json!({ "name": name })));
    }

    assert_eq!(*seen.lock(), vec!["Bricksy", "brisky", "Bricksy"]);
}

/// Patching one field keeps the others.
#[test]
fn patch_preserves_untouched_fields() {
    let store = create_store(json!({ "count": 0, "name": "Bricksy" }));

    store.patch(object(json!({ "count": 1 })));

    assert_eq!(*store.snapshot(), json!({ "count": 1, "name": "Bricksy" }));
}

/// Error and loading flags are independent of data.
#[test]
fn error_and_loading_views_are_independent() {
    let store: Store<i64> = Store::new(0);
    let (errors, on_error) = collect::<Option<String>>();
    let (loading, on_loading) = collect::<bool>();
    let _e = store.error().subscribe(on_error);
    let _l = store.is_loading().subscribe(on_loading);

    store.set_is_loading(true);
    store.set_error(Some("timeout".into()));
    store.set_data(1);
    store.set_error(None);
    store.set_is_loading(false);

    assert_eq!(
        *errors.lock(),
        vec![None, Some("timeout".to_string()), None]
    );
    assert_eq!(*loading.lock(), vec![false, true, false]);
    assert_eq!(*store.snapshot(), 1);
}

/// The JSON bridge records the initial state and every matched dispatch.
#[test]
fn json_bridge_records_dispatches() {
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let buffer = SharedBuffer::default();
    let store: Store<Value> = Store::builder()
        .name("counter")
        .debug_bridge(JsonLinesBridge::new(buffer.clone()))
        .build(json!({ "count": 0 }));
    store
        .register_action("increment", |state: &Value, n: &i64| {
            json!({ "count": state["count"].as_i64().unwrap_or(0) + n })
        })
        .unwrap();

    store.dispatch("increment", 2_i64).unwrap();
    store.dispatch("ignored", 2_i64).unwrap();

    let bytes = buffer.0.lock().clone();
    let lines: Vec<Value> = String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["type"], "init");
    assert_eq!(lines[0]["state"]["data"], json!({ "count": 0 }));
    assert_eq!(lines[1]["action"], "increment");
    assert_eq!(lines[1]["state"]["data"], json!({ "count": 2 }));
    assert_eq!(lines[1]["state"]["isLoading"], false);
}

/// A named store can be found from elsewhere through the global directory.
#[test]
fn named_store_is_reachable_through_the_global_directory() {
    let name = "integration-cart";
    let cart = create_named_store(name, Vec::<String>::new());
    cart.register_action("add", |items: &Vec<String>, item: &String| {
        let mut next = items.clone();
        next.push(item.clone());
        next
    })
    .unwrap();

    let elsewhere = Directory::global()
        .get::<Vec<String>, String>(name)
        .expect("cart should be registered");
    elsewhere.dispatch("add", "brick".to_string()).unwrap();

    assert_eq!(*cart.snapshot(), vec!["brick".to_string()]);
    Directory::global().unregister(name);
}

/// An async side effect is spawned, not awaited, and reports completion by
/// publishing state.
#[tokio::test]
async fn async_side_effect_completes_after_dispatch_returns() {
    let store: Store<Vec<String>> = Store::new(Vec::new());
    let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();

    let effect_store = store.clone();
    store
        .register_async_side_effect("search", move |query: &String| {
            effect_store.set_is_loading(true);
            let store = effect_store.clone();
            let done = done_tx.clone();
            let query = query.clone();
            async move {
                tokio::task::yield_now().await;
                store.set_data(vec![format!("result for {query}")]);
                store.set_is_loading(false);
                let _ = done.send(());
            }
        })
        .unwrap();

    store.dispatch("search", "bricks".to_string()).unwrap();
    assert!(store.get_value().is_loading);
    assert!(store.snapshot().is_empty());

    done_rx.recv().await.unwrap();

    let state = store.get_value();
    assert!(!state.is_loading);
    assert_eq!(*state.data, vec!["result for bricks".to_string()]);
}
