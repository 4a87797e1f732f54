//! # Store configuration.
//!
//! Provides [`StoreConfig`] (store-wide defaults) and [`SubscribeOptions`]
//! (per-subscription overrides).
//!
//! Two behaviors are deliberately configuration rather than assumptions:
//! whether listeners receive the previous slice alongside the current one,
//! and whether a channel write whose payload is deep-equal to the channel's
//! cached slice is still forwarded to the root merge.

/// Store-wide configuration.
///
/// ## Field semantics
/// - `with_previous_state`: default notification shape for subscriptions
///   made through [`Store::subscribe`](crate::Store::subscribe); individual
///   subscriptions can override it via [`SubscribeOptions`].
/// - `merge_unchanged`: controls what a channel write does when its payload
///   is deep-equal to the channel's cached previous slice. `false` drops the
///   write entirely (no merge, no dispatch). `true` still forwards it to the
///   root merge - if another writer moved the root value in the meantime,
///   the forwarded write wins it back and dispatch fires for the keys that
///   actually changed at the root. Dispatch is diff-driven either way.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreConfig {
    /// Listeners receive `(current, previous)` instead of `(current)` only.
    pub with_previous_state: bool,

    /// Forward channel writes that are deep-equal to the cached slice.
    pub merge_unchanged: bool,
}

/// Per-subscription options.
///
/// ## Example
/// ```
/// use std::sync::Arc;
/// use slicestore::{Store, SubscribeFn, SubscribeOptions};
///
/// let store = Store::new();
/// let handle = store.subscribe_with(
///     &["x"],
///     SubscribeFn::arc("diffing", |current, previous| {
///         println!("{previous:?} -> {current:?}");
///     }),
///     SubscribeOptions { with_previous_state: true },
/// );
/// # let _ = handle;
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct SubscribeOptions {
    /// This listener receives `(current, previous)` instead of `(current)`.
    pub with_previous_state: bool,
}

impl SubscribeOptions {
    /// Options inherited from the store-wide configuration.
    pub(crate) fn from_config(config: &StoreConfig) -> Self {
        Self {
            with_previous_state: config.with_previous_state,
        }
    }
}
