//! # Store: root state owner and update dispatcher.
//!
//! The store owns the single root mapping, the subscription [`Registry`] and
//! the notification queue (subscriber id → [`UpdateChannel`]). Every write -
//! root-level [`Store::set`] or a handle's
//! [`SliceHandle::set`](crate::SliceHandle::set) - funnels into one apply
//! step: shallow-merge into root, diff against the previous root to find
//! the keys that actually changed, then dispatch.
//!
//! ## Architecture
//! ```text
//! Store::set ────────────┐
//!                        ▼
//! SliceHandle::set ──► apply(update)
//!                        │  merge into root (replace wholesale)
//!                        │  changed = keys whose root value moved
//!                        ▼
//!                      dispatch(changed)
//!                        │  impacted = ∪ registry[key] for key in changed
//!                        ▼
//!            UpdateChannel::notify()  (once per impacted subscriber)
//!                        ▼
//!            Subscribe::on_change(current, previous?)
//! ```
//!
//! ## Rules
//! - No lock is held while a listener runs; a listener calling `set`
//!   re-enters apply/dispatch as a plain nested call and completes before
//!   control returns to the outer dispatch loop.
//! - Dispatch order across listeners is unspecified.
//! - Updating a key nobody watches is legal and cheap (empty impacted set).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::core::builder::StoreBuilder;
use crate::core::channel::{SliceHandle, UpdateChannel};
use crate::core::config::{StoreConfig, SubscribeOptions};
use crate::core::registry::{Registry, SubscriberId};
use crate::error::StoreError;
use crate::state::{self, StateMap};
use crate::subscribers::ListenerRef;

/// Key-sliced observable state store.
///
/// Cheap to clone; all clones share the same root state and subscriptions.
///
/// ## Example
/// ```
/// use serde_json::json;
/// use slicestore::{Store, SubscribeFn};
///
/// let store = Store::with_initial(json!({"x": 1, "y": 2})).unwrap();
///
/// let handle = store.subscribe(
///     &["x"],
///     SubscribeFn::arc("x-watcher", |current, _| {
///         println!("x is now {:?}", current.get("x"));
///     }),
/// );
///
/// store.set(json!({"x": 1, "y": 9})).unwrap(); // x unchanged: no call
/// store.set(json!({"x": 5})).unwrap(); // one call with {"x": 5}
/// # let _ = handle;
/// ```
#[derive(Clone)]
pub struct Store {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

/// State shared by the store, its clones and every [`SliceHandle`].
pub(crate) struct Shared {
    pub(crate) config: StoreConfig,
    /// Root mapping; `None` until first initialized. Replaced wholesale on
    /// every apply, never mutated in place.
    root: RwLock<Option<StateMap>>,
    pub(crate) registry: RwLock<Registry>,
    /// Notification queue: one channel per live subscription.
    queue: RwLock<HashMap<SubscriberId, Arc<UpdateChannel>>>,
}

impl Store {
    /// Creates a store with absent root state and default configuration.
    pub fn new() -> Self {
        Self::from_parts(StoreConfig::default(), None)
    }

    /// Creates a store from an initial state value.
    ///
    /// `null` is accepted and leaves root state absent; any non-object value
    /// fails with [`StoreError::InvalidInitialState`] naming the runtime
    /// type, before any subscriber can be registered.
    pub fn with_initial(initial: Value) -> Result<Self, StoreError> {
        StoreBuilder::new().with_initial(initial).build()
    }

    /// Returns a builder for configuring the store before construction.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    pub(crate) fn from_parts(config: StoreConfig, root: Option<StateMap>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                root: RwLock::new(root),
                registry: RwLock::new(Registry::new()),
                queue: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Registers `listener` for `keys` and returns the caller-facing handle.
    ///
    /// The handle exposes `get`/`set`/`set_with`/`unsubscribe`; the notify
    /// entry point stays internal to the dispatcher. Subscribing to keys not
    /// yet present in root state is legal - they are simply omitted from
    /// `get()` until a write introduces them.
    pub fn subscribe(&self, keys: &[&str], listener: ListenerRef) -> SliceHandle {
        self.subscribe_with(keys, listener, SubscribeOptions::from_config(&self.shared.config))
    }

    /// Like [`Store::subscribe`], with per-subscription options.
    pub fn subscribe_with(
        &self,
        keys: &[&str],
        listener: ListenerRef,
        options: SubscribeOptions,
    ) -> SliceHandle {
        let id = SubscriberId::next();
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();

        self.shared.registry.write().register(&keys, id);

        // The cached previous slice starts at the slice as of subscribe
        // time, so the first notification can diff against it.
        let initial = self.shared.slice(&keys);
        let channel = UpdateChannel::new(id, listener, options.with_previous_state, initial);
        self.shared.queue.write().insert(id, channel);

        SliceHandle {
            shared: Arc::clone(&self.shared),
            id,
        }
    }

    /// Root-level write.
    ///
    /// The payload must be a plain object (`null` is a no-op); anything else
    /// fails with [`StoreError::InvalidUpdate`] before any state is touched.
    /// Keys whose new value is deep-equal to the current root value are
    /// merged but produce no notification.
    pub fn set(&self, update: Value) -> Result<(), StoreError> {
        match state::into_object(update) {
            Ok(Some(update)) => {
                self.shared.apply(update);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(actual) => Err(StoreError::InvalidUpdate { actual }),
        }
    }

    /// Read-only projection of current root state onto `keys`.
    ///
    /// Keys absent from root state are omitted; the result is empty while
    /// root state is absent.
    pub fn slice_state(&self, keys: &[&str]) -> StateMap {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        self.shared.slice(&keys)
    }

    /// Returns a copy of the full root state, or `None` if it was never
    /// initialized.
    pub fn root_state(&self) -> Option<StateMap> {
        self.shared.root.read().clone()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Shared {
    /// Keys the given subscription currently watches (sorted).
    pub(crate) fn watched_keys(&self, id: SubscriberId) -> Vec<String> {
        self.registry.read().keys_for(id)
    }

    /// Owned projection of current root state onto `keys`.
    pub(crate) fn slice(&self, keys: &[String]) -> StateMap {
        match self.root.read().as_ref() {
            Some(root) => state::take(root, keys.iter()),
            None => StateMap::new(),
        }
    }

    pub(crate) fn channel(&self, id: SubscriberId) -> Option<Arc<UpdateChannel>> {
        self.queue.read().get(&id).cloned()
    }

    /// Drops the channel for a fully-revoked subscription from the
    /// notification queue, releasing the listener.
    pub(crate) fn release(&self, id: SubscriberId) {
        if self.queue.write().remove(&id).is_some() {
            tracing::debug!(subscriber = ?id, "released subscription");
        }
    }

    /// Applies one update: merge into root, then dispatch the keys whose
    /// root value actually changed.
    ///
    /// The root lock is released before dispatch so listeners can read (and
    /// re-enter writes against) the store freely.
    pub(crate) fn apply(&self, update: StateMap) {
        if update.is_empty() {
            return;
        }

        let changed: Vec<String> = {
            let mut root = self.root.write();
            let changed = match root.as_ref() {
                Some(current) => state::changed_keys(&update, current),
                None => update.keys().cloned().collect(),
            };
            *root = Some(state::merge(root.as_ref(), &update));
            changed
        };

        tracing::trace!(keys = ?changed, "applied update");
        if !changed.is_empty() {
            self.dispatch(&changed);
        }
    }

    /// Notifies every subscriber impacted by `changed`, each exactly once.
    fn dispatch(&self, changed: &[String]) {
        let impacted = self.registry.read().impacted(changed);
        if impacted.is_empty() {
            return;
        }

        // Snapshot the channels, then drop every lock before notifying.
        let channels: Vec<Arc<UpdateChannel>> = {
            let queue = self.queue.read();
            impacted
                .iter()
                .filter_map(|id| queue.get(id).cloned())
                .collect()
        };

        tracing::trace!(keys = ?changed, subscribers = channels.len(), "dispatching");
        for channel in channels {
            channel.notify(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::SubscribeFn;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counter() -> (Arc<AtomicUsize>, ListenerRef) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let listener = SubscribeFn::arc("counter", move |_: &StateMap, _: Option<&StateMap>| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (calls, listener)
    }

    #[test]
    fn test_slice_state_reflects_last_write() {
        let store = Store::with_initial(json!({"a": 1, "b": 2})).unwrap();
        store.set(json!({"a": 10})).unwrap();
        assert_eq!(store.slice_state(&["a"]), json!({"a": 10}).as_object().unwrap().clone());
        assert_eq!(store.slice_state(&["b"])["b"], json!(2));
    }

    #[test]
    fn test_uninitialized_root_is_absent() {
        let store = Store::new();
        assert_eq!(store.root_state(), None);
        assert!(store.slice_state(&["anything"]).is_empty());

        store.set(json!({"x": 1})).unwrap();
        assert_eq!(store.root_state().unwrap()["x"], json!(1));
    }

    #[test]
    fn test_invalid_initial_state_names_runtime_type() {
        let err = Store::with_initial(json!(42)).unwrap_err();
        assert_eq!(err, StoreError::InvalidInitialState { actual: "number" });

        let err = Store::with_initial(json!([1, 2])).unwrap_err();
        assert_eq!(err, StoreError::InvalidInitialState { actual: "array" });
    }

    #[test]
    fn test_invalid_update_names_runtime_type() {
        let store = Store::new();
        let err = store.set(json!("nope")).unwrap_err();
        assert_eq!(err, StoreError::InvalidUpdate { actual: "string" });
        // failed validation left no state behind
        assert_eq!(store.root_state(), None);
    }

    #[test]
    fn test_null_initial_and_null_update_are_no_ops() {
        let store = Store::with_initial(json!(null)).unwrap();
        assert_eq!(store.root_state(), None);
        store.set(json!(null)).unwrap();
        assert_eq!(store.root_state(), None);
    }

    #[test]
    fn test_listener_notified_once_for_multi_key_update() {
        let store = Store::with_initial(json!({"a": 1, "b": 2, "c": 3})).unwrap();
        let (calls, listener) = counter();
        let _handle = store.subscribe(&["a", "b"], listener);

        store.set(json!({"a": 10, "b": 20})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.set(json!({"c": 30})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_single_key_keeps_others_live() {
        let store = Store::with_initial(json!({"a": 1, "b": 2})).unwrap();
        let (calls, listener) = counter();
        let handle = store.subscribe(&["a", "b"], listener);

        handle.unsubscribe(["a"]);
        store.set(json!({"a": 99})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.set(json!({"b": 99})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // unsubscribed key also disappears from the visible slice
        assert!(!handle.get().contains_key("a"));
        assert_eq!(handle.get()["b"], json!(99));
    }

    #[test]
    fn test_unsubscribe_all_releases_subscription() {
        let store = Store::with_initial(json!({"a": 1, "b": 2})).unwrap();
        let listener = SubscribeFn::arc("ephemeral", |_: &StateMap, _: Option<&StateMap>| {});
        let weak = Arc::downgrade(&listener);
        let handle = store.subscribe(&["a", "b"], listener);

        handle.unsubscribe(["a"]);
        assert!(weak.upgrade().is_some(), "partially revoked subscription stays live");

        handle.unsubscribe(["b"]);
        assert!(weak.upgrade().is_none(), "listener must drop with the queue entry");
        assert_eq!(store.shared.queue.read().len(), 0);
        assert_eq!(store.shared.registry.read().subscriber_count(), 0);

        // the handle stays valid but inert
        assert!(handle.get().is_empty());
        handle.set(json!({"a": 99})).unwrap();
        assert_eq!(store.slice_state(&["a"])["a"], json!(1));
    }

    #[test]
    fn test_close_releases_subscription() {
        let store = Store::with_initial(json!({"a": 1})).unwrap();
        let (calls, listener) = counter();
        let handle = store.subscribe(&["a"], listener);

        handle.close();
        store.set(json!({"a": 2})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.shared.queue.read().len(), 0);

        handle.close(); // idempotent
    }

    #[test]
    fn test_churned_subscriptions_do_not_accumulate() {
        let store = Store::with_initial(json!({"a": 0})).unwrap();
        for _ in 0..64 {
            let (_, listener) = counter();
            store.subscribe(&["a"], listener).close();
        }
        assert_eq!(store.shared.queue.read().len(), 0);
        assert_eq!(store.shared.registry.read().subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_unwatched_key_is_silent() {
        let store = Store::with_initial(json!({"a": 1})).unwrap();
        let (calls, listener) = counter();
        let handle = store.subscribe(&["a"], listener);

        handle.unsubscribe(["ghost"]);
        store.set(json!({"a": 2})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deep_equal_write_is_suppressed() {
        let store = Store::with_initial(json!({"a": {"deep": [1, 2]}})).unwrap();
        let (calls, listener) = counter();
        let _handle = store.subscribe(&["a"], listener);

        store.set(json!({"a": {"deep": [1, 2]}})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.set(json!({"a": {"deep": [1, 2, 3]}})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fanout_reaches_every_listener_on_a_key() {
        let store = Store::with_initial(json!({"k": 0})).unwrap();
        let (calls_a, listener_a) = counter();
        let (calls_b, listener_b) = counter();
        let _first = store.subscribe(&["k"], listener_a);
        let _second = store.subscribe(&["k"], listener_b);

        store.set(json!({"k": 1})).unwrap();
        assert_eq!(calls_a.load(Ordering::SeqCst), 1);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_readme_scenario() {
        // store = createStore({x: 1, y: 2}); watch x;
        // set({x: 1, y: 9}) -> not called; set({x: 5}) -> called once.
        let store = Store::with_initial(json!({"x": 1, "y": 2})).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let last_slice = Arc::new(Mutex::new(StateMap::new()));
        let seen_calls = Arc::clone(&calls);
        let seen_slice = Arc::clone(&last_slice);
        let _handle = store.subscribe(
            &["x"],
            SubscribeFn::arc("x-watcher", move |current: &StateMap, _| {
                seen_calls.fetch_add(1, Ordering::SeqCst);
                *seen_slice.lock().unwrap() = current.clone();
            }),
        );

        store.set(json!({"x": 1, "y": 9})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.set(json!({"x": 5})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(last_slice.lock().unwrap()["x"], json!(5));
    }

    #[test]
    fn test_subscribe_to_absent_key() {
        let store = Store::new();
        let (calls, listener) = counter();
        let handle = store.subscribe(&["later"], listener);

        assert!(handle.get().is_empty());

        store.set(json!({"later": "here"})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.get()["later"], json!("here"));
    }

    #[test]
    fn test_handle_set_filters_to_watched_keys() {
        let store = Store::with_initial(json!({"mine": 1, "other": 1})).unwrap();
        let (calls, listener) = counter();
        let handle = store.subscribe(&["mine"], listener);

        handle.set(json!({"mine": 2, "other": 2})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // the unwatched key never reached the root merge
        assert_eq!(store.slice_state(&["other"])["other"], json!(1));
        assert_eq!(store.slice_state(&["mine"])["mine"], json!(2));
    }

    #[test]
    fn test_handle_noop_set_is_suppressed() {
        let store = Store::with_initial(json!({"a": 1})).unwrap();
        let (calls, listener) = counter();
        let handle = store.subscribe(&["a"], listener);

        handle.set(json!({"a": 1})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handle_invalid_set_names_runtime_type() {
        let store = Store::with_initial(json!({"a": 1})).unwrap();
        let (_, listener) = counter();
        let handle = store.subscribe(&["a"], listener);

        let err = handle.set(json!(true)).unwrap_err();
        assert_eq!(err, StoreError::InvalidUpdate { actual: "boolean" });
    }

    #[test]
    fn test_set_with_receives_previous_slice() {
        let store = Store::with_initial(json!({"count": 41})).unwrap();
        let (_, listener) = counter();
        let handle = store.subscribe(&["count"], listener);

        handle
            .set_with(|previous| {
                let count = previous["count"].as_i64().unwrap();
                json!({"count": count + 1})
            })
            .unwrap();
        assert_eq!(store.slice_state(&["count"])["count"], json!(42));
    }

    #[test]
    fn test_with_previous_state_option() {
        let store = Store::with_initial(json!({"v": 1})).unwrap();
        let observed = Arc::new(Mutex::new(Vec::<(StateMap, Option<StateMap>)>::new()));
        let sink = Arc::clone(&observed);
        let _handle = store.subscribe_with(
            &["v"],
            SubscribeFn::arc("pairs", move |current: &StateMap, previous: Option<&StateMap>| {
                sink.lock().unwrap().push((current.clone(), previous.cloned()));
            }),
            SubscribeOptions { with_previous_state: true },
        );

        store.set(json!({"v": 2})).unwrap();
        store.set(json!({"v": 3})).unwrap();

        let observed = observed.lock().unwrap();
        assert_eq!(observed.len(), 2);
        assert_eq!(observed[0].0["v"], json!(2));
        assert_eq!(observed[0].1.as_ref().unwrap()["v"], json!(1));
        assert_eq!(observed[1].0["v"], json!(3));
        assert_eq!(observed[1].1.as_ref().unwrap()["v"], json!(2));
    }

    #[test]
    fn test_previous_state_defaults_to_absent() {
        let store = Store::with_initial(json!({"v": 1})).unwrap();
        let saw_previous = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&saw_previous);
        let _handle = store.subscribe(
            &["v"],
            SubscribeFn::arc("no-pairs", move |_: &StateMap, previous: Option<&StateMap>| {
                if previous.is_some() {
                    sink.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );

        store.set(json!({"v": 2})).unwrap();
        assert_eq!(saw_previous.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reentrant_set_from_listener() {
        // A listener on "a" writes "b" during its own notification; the
        // nested apply/dispatch must complete inline without deadlocking.
        let store = Store::with_initial(json!({"a": 0, "b": 0})).unwrap();
        let writer = store.clone();
        let _chain = store.subscribe(
            &["a"],
            SubscribeFn::arc("chain", move |current: &StateMap, _| {
                let a = current["a"].as_i64().unwrap();
                writer.set(json!({"b": a * 10})).unwrap();
            }),
        );
        let (b_calls, b_listener) = counter();
        let _b_watcher = store.subscribe(&["b"], b_listener);

        store.set(json!({"a": 7})).unwrap();
        assert_eq!(store.slice_state(&["b"])["b"], json!(70));
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    /// Builds a store whose single subscriber panics on its first
    /// notification, leaving the channel's cached slice stale: root moved
    /// to `{"a": 2}` while the cache still says `{"a": 1}`.
    fn store_with_stale_cache(config: StoreConfig) -> (Store, SliceHandle) {
        let store = Store::builder()
            .with_config(config)
            .with_initial(json!({"a": 1}))
            .build()
            .unwrap();
        let armed = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let trigger = Arc::clone(&armed);
        let handle = store.subscribe(
            &["a"],
            SubscribeFn::arc("tripwire", move |_: &StateMap, _| {
                if trigger.swap(false, Ordering::SeqCst) {
                    panic!("listener failure");
                }
            }),
        );

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.set(json!({"a": 2})).unwrap();
        }));
        // the panic propagated to the set caller, but root was merged first
        assert!(result.is_err());
        assert_eq!(store.slice_state(&["a"])["a"], json!(2));
        (store, handle)
    }

    #[test]
    fn test_merge_unchanged_forwards_stale_equal_write() {
        let (store, handle) = store_with_stale_cache(StoreConfig {
            merge_unchanged: true,
            ..StoreConfig::default()
        });

        // Deep-equal to the stale cache, but different from root: with
        // merge_unchanged the write is forwarded and wins the root back.
        handle.set(json!({"a": 1})).unwrap();
        assert_eq!(store.slice_state(&["a"])["a"], json!(1));
    }

    #[test]
    fn test_default_drops_write_equal_to_cached_slice() {
        let (store, handle) = store_with_stale_cache(StoreConfig::default());

        // Same write, default config: suppressed before reaching the root.
        handle.set(json!({"a": 1})).unwrap();
        assert_eq!(store.slice_state(&["a"])["a"], json!(2));
    }

    #[test]
    fn test_update_without_subscribers_is_cheap_and_legal() {
        let store = Store::new();
        store.set(json!({"lonely": 1})).unwrap();
        assert_eq!(store.slice_state(&["lonely"])["lonely"], json!(1));
    }

    #[test]
    fn test_get_returns_detached_copy() {
        let store = Store::with_initial(json!({"a": [1]})).unwrap();
        let (_, listener) = counter();
        let handle = store.subscribe(&["a"], listener);

        let mut slice = handle.get();
        slice.insert("a".into(), json!("mutated"));
        assert_eq!(store.slice_state(&["a"])["a"], json!([1]));
    }

    #[test]
    fn test_root_snapshot_survives_later_writes() {
        let store = Store::with_initial(json!({"a": 1})).unwrap();
        let snapshot = store.root_state().unwrap();
        store.set(json!({"a": 2})).unwrap();
        assert_eq!(snapshot["a"], json!(1));
        assert_eq!(store.root_state().unwrap()["a"], json!(2));
    }
}
