//! # Subscription registry - per-key listener indexing.
//!
//! The registry is the only place subscriber interest is recorded; fan-out
//! must go through it, there is no global listener list anywhere else.
//!
//! ## Architecture
//! ```text
//! by_key:        "a" ──► {s1, s2}        by_subscriber:  s1 ──► {"a", "b"}
//!                "b" ──► {s1}                            s2 ──► {"a"}
//!
//! impacted(["a", "b"]) = {s1, s2} ∪ {s1} = {s1, s2}
//! ```
//!
//! ## Rules
//! - `by_key` and `by_subscriber` are two views of the same relation and are
//!   always updated together: a key is in a subscriber's watched set iff the
//!   subscriber is in that key's listener set.
//! - `revoke` silently ignores keys the subscriber does not watch
//!   (idempotent); emptied per-key sets are pruned, and a subscriber whose
//!   watched set empties is dropped from the index entirely so churned
//!   subscriptions do not accumulate.
//! - `impacted` returns a set union, which is what bounds notification to
//!   at most once per subscriber per dispatch.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter backing [`SubscriberId`] allocation.
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque, stable identity of one subscription.
///
/// Minted at subscribe time and used for all later revoke/lookup calls.
/// Identity is by token, never by listener value: subscribing the same
/// listener twice yields two independent subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Per-key subscriber sets plus the per-subscriber watched-key reverse index.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    by_key: HashMap<String, HashSet<SubscriberId>>,
    by_subscriber: HashMap<SubscriberId, HashSet<String>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers interest of `id` in each of `keys`, creating per-key sets
    /// as needed.
    pub(crate) fn register(&mut self, keys: &[String], id: SubscriberId) {
        let watched = self.by_subscriber.entry(id).or_default();
        for key in keys {
            self.by_key.entry(key.clone()).or_default().insert(id);
            watched.insert(key.clone());
        }
        tracing::debug!(subscriber = id.0, keys = ?keys, "registered subscriber");
    }

    /// Removes `id` from each of `keys` it still watches.
    ///
    /// Keys not currently watched by `id` are silently ignored. Per-key
    /// sets that become empty are removed from the index.
    ///
    /// Returns `true` when `id` no longer watches anything: its reverse
    /// index entry has been dropped and the caller should release whatever
    /// else it holds for this subscription (the notification-queue entry).
    pub(crate) fn revoke(&mut self, id: SubscriberId, keys: &[String]) -> bool {
        let Some(watched) = self.by_subscriber.get_mut(&id) else {
            return true;
        };
        for key in keys {
            if !watched.remove(key) {
                continue;
            }
            if let Some(listeners) = self.by_key.get_mut(key) {
                listeners.remove(&id);
                if listeners.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }
        tracing::debug!(subscriber = id.0, keys = ?keys, "revoked keys");

        if self.by_subscriber.get(&id).is_some_and(HashSet::is_empty) {
            self.by_subscriber.remove(&id);
        }
        !self.by_subscriber.contains_key(&id)
    }

    /// Returns the keys `id` currently watches, sorted for deterministic
    /// slice projections.
    pub(crate) fn keys_for(&self, id: SubscriberId) -> Vec<String> {
        let mut keys: Vec<String> = self
            .by_subscriber
            .get(&id)
            .map(|watched| watched.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    /// Unions the per-key subscriber sets for `changed` into the distinct
    /// impacted-subscriber set.
    pub(crate) fn impacted(&self, changed: &[String]) -> HashSet<SubscriberId> {
        let mut impacted = HashSet::new();
        for key in changed {
            if let Some(listeners) = self.by_key.get(key) {
                impacted.extend(listeners.iter().copied());
            }
        }
        impacted
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.by_subscriber.len()
    }

    #[cfg(test)]
    pub(crate) fn is_watching(&self, id: SubscriberId, key: &str) -> bool {
        let in_reverse = self
            .by_subscriber
            .get(&id)
            .is_some_and(|watched| watched.contains(key));
        let in_forward = self
            .by_key
            .get(key)
            .is_some_and(|listeners| listeners.contains(&id));
        assert_eq!(in_reverse, in_forward, "registry indexes diverged");
        in_reverse
    }
}
