//! # Per-subscriber update channel and the public slice handle.
//!
//! Each subscription owns two objects backed by the same [`SubscriberId`]:
//!
//! - [`UpdateChannel`] (crate-internal) - lives in the store's notification
//!   queue and carries the one entry point the dispatcher may use,
//!   [`UpdateChannel::notify`]. Callers never see it, so a subscriber cannot
//!   self-trigger except through a real state write.
//! - [`SliceHandle`] (public) - returned to the caller; bundles `get`,
//!   `set`/`set_with` and `unsubscribe` over the subscription's watched keys.
//!
//! Splitting the capability across two types is what keeps `notify`
//! dispatcher-only without any runtime hiding tricks.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::core::registry::SubscriberId;
use crate::core::store::Shared;
use crate::error::StoreError;
use crate::state::{self, StateMap};
use crate::subscribers::ListenerRef;

/// Internal notification endpoint for one subscription.
///
/// Holds the listener and the cached previous slice used both for change
/// suppression on channel writes and for the optional `(current, previous)`
/// notification shape.
pub(crate) struct UpdateChannel {
    id: SubscriberId,
    listener: ListenerRef,
    with_previous_state: bool,
    /// Slice as of the last notification (or subscribe time). The root is
    /// replaced wholesale on every apply, so this stays a stable snapshot
    /// of the prior version.
    previous: Mutex<StateMap>,
}

impl UpdateChannel {
    pub(crate) fn new(
        id: SubscriberId,
        listener: ListenerRef,
        with_previous_state: bool,
        initial: StateMap,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            listener,
            with_previous_state,
            previous: Mutex::new(initial),
        })
    }

    pub(crate) fn previous_slice(&self) -> StateMap {
        self.previous.lock().clone()
    }

    /// Recomputes the current slice, invokes the listener, then caches the
    /// current slice as the new previous one.
    ///
    /// The dispatcher calls this at most once per apply; no store lock is
    /// held while the listener runs, so a listener writing back into the
    /// store nests a full apply/dispatch cycle inside this call.
    pub(crate) fn notify(&self, shared: &Shared) {
        let keys = shared.watched_keys(self.id);
        let current = shared.slice(&keys);
        let previous = self.previous_slice();

        tracing::trace!(
            subscriber = self.listener.name(),
            keys = ?keys,
            "notifying listener"
        );
        if self.with_previous_state {
            self.listener.on_change(&current, Some(&previous));
        } else {
            self.listener.on_change(&current, None);
        }

        *self.previous.lock() = current;
    }
}

/// Caller-facing handle to one subscription.
///
/// Cheap to clone; all clones refer to the same subscription. Dropping the
/// handle does not unsubscribe - call [`SliceHandle::unsubscribe`] for the
/// keys you no longer want.
///
/// ## Example
/// ```
/// use serde_json::json;
/// use slicestore::{Store, SubscribeFn};
///
/// let store = Store::with_initial(json!({"x": 1})).unwrap();
/// let handle = store.subscribe(&["x"], SubscribeFn::arc("watcher", |_, _| {}));
///
/// handle.set(json!({"x": 2})).unwrap();
/// assert_eq!(handle.get()["x"], json!(2));
/// ```
#[derive(Clone)]
pub struct SliceHandle {
    pub(crate) shared: Arc<Shared>,
    pub(crate) id: SubscriberId,
}

impl SliceHandle {
    /// Opaque identity of this subscription.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Returns the projection of current root state onto this handle's
    /// currently-watched keys.
    ///
    /// The result is an owned copy; mutating it never touches root state.
    /// Watched keys absent from root state are omitted, and the result is
    /// empty while root state is absent.
    pub fn get(&self) -> StateMap {
        let keys = self.shared.watched_keys(self.id);
        self.shared.slice(&keys)
    }

    /// Writes a literal partial update into this handle's slice.
    ///
    /// The payload must be a plain object (`null` is accepted as a no-op);
    /// anything else fails with [`StoreError::InvalidUpdate`] naming the
    /// runtime type, before any state is touched. Keys outside the watched
    /// set are silently dropped. If, after filtering, every value is
    /// deep-equal to the cached slice, the write is suppressed (unless the
    /// store was configured with `merge_unchanged`).
    pub fn set(&self, update: Value) -> Result<(), StoreError> {
        match state::into_object(update) {
            Ok(Some(update)) => {
                self.apply_update(update);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(actual) => Err(StoreError::InvalidUpdate { actual }),
        }
    }

    /// Writes an update produced from the previous slice.
    ///
    /// `make` receives the cached previous slice and must return a plain
    /// object (or `null` for a no-op); the result goes through the same
    /// validation, filtering and diffing as [`SliceHandle::set`].
    ///
    /// ## Example
    /// ```
    /// use serde_json::json;
    /// use slicestore::{Store, SubscribeFn};
    ///
    /// let store = Store::with_initial(json!({"count": 1})).unwrap();
    /// let handle = store.subscribe(&["count"], SubscribeFn::arc("counter", |_, _| {}));
    ///
    /// handle
    ///     .set_with(|previous| {
    ///         let count = previous["count"].as_i64().unwrap_or(0);
    ///         json!({"count": count + 1})
    ///     })
    ///     .unwrap();
    /// assert_eq!(handle.get()["count"], json!(2));
    /// ```
    pub fn set_with<F>(&self, make: F) -> Result<(), StoreError>
    where
        F: FnOnce(&StateMap) -> Value,
    {
        let previous = match self.shared.channel(self.id) {
            Some(channel) => channel.previous_slice(),
            None => StateMap::new(),
        };
        self.set(make(&previous))
    }

    /// Stops watching one or more keys.
    ///
    /// Keys this handle does not currently watch are silently ignored.
    /// Once the last watched key is revoked the subscription is released
    /// entirely: its channel leaves the notification queue and the listener
    /// is dropped, so churned subscriptions do not accumulate in the store.
    pub fn unsubscribe<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|key| key.as_ref().to_string()).collect();
        let released = self.shared.registry.write().revoke(self.id, &keys);
        if released {
            self.shared.release(self.id);
        }
    }

    /// Releases the whole subscription: revokes every watched key and drops
    /// the channel (and its listener) from the notification queue.
    ///
    /// Idempotent; the handle stays valid but inert - `get()` returns an
    /// empty slice and writes are no-ops.
    pub fn close(&self) {
        let watched = self.shared.watched_keys(self.id);
        self.unsubscribe(watched);
    }

    /// Diff-then-forward step shared by `set` and `set_with`.
    fn apply_update(&self, update: StateMap) {
        let Some(channel) = self.shared.channel(self.id) else {
            return;
        };
        let watched = self.shared.watched_keys(self.id);
        let update = state::take(&update, watched.iter());

        let previous = channel.previous_slice();
        let changed = state::changed_keys(&update, &previous);
        if changed.is_empty() && !self.shared.config.merge_unchanged {
            tracing::trace!(keys = ?update.keys().collect::<Vec<_>>(), "suppressed no-op write");
            return;
        }

        let forward = if self.shared.config.merge_unchanged {
            update
        } else {
            state::take(&update, changed.iter())
        };
        self.shared.apply(forward);
    }
}
