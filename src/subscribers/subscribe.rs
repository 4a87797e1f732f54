//! # Core listener trait
//!
//! `Subscribe` is the extension point for reacting to slice changes. A
//! listener is registered for a set of field keys via
//! [`Store::subscribe`](crate::Store::subscribe) and invoked synchronously,
//! inline with the write that changed its slice.
//!
//! ## Contract
//! - `on_change` runs on the caller's stack during dispatch. A listener that
//!   writes back into the store re-enters apply/dispatch as a nested call;
//!   that is supported and ordering stays synchronous.
//! - `previous` is `Some` only for subscriptions registered with
//!   `with_previous_state` (see [`SubscribeOptions`](crate::SubscribeOptions)).
//! - Panics are not caught: a panicking listener aborts the remaining
//!   fan-out for that update and propagates to the `set` caller.

use std::borrow::Cow;
use std::sync::Arc;

use crate::state::StateMap;

/// Shared handle to a listener (`Arc<dyn Subscribe>`).
pub type ListenerRef = Arc<dyn Subscribe>;

/// Contract for slice-change listeners.
pub trait Subscribe: Send + Sync + 'static {
    /// Handle one notification for this listener.
    ///
    /// # Parameters
    /// - `current`: the projection of root state onto the keys this listener
    ///   currently watches (an owned copy, safe to keep).
    /// - `previous`: the slice as it was before this update, when the
    ///   subscription asked for it; `None` otherwise.
    fn on_change(&self, current: &StateMap, previous: Option<&StateMap>);

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Function-backed listener.
///
/// Wraps a closure so ad-hoc listeners don't need a named type.
///
/// ## Example
/// ```
/// use slicestore::{ListenerRef, SubscribeFn};
///
/// let listener: ListenerRef = SubscribeFn::arc("printer", |current, _previous| {
///     println!("slice is now {current:?}");
/// });
/// assert_eq!(listener.name(), "printer");
/// ```
pub struct SubscribeFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> SubscribeFn<F>
where
    F: Fn(&StateMap, Option<&StateMap>) + Send + Sync + 'static,
{
    /// Creates a new function-backed listener.
    ///
    /// Prefer [`SubscribeFn::arc`] when you immediately need a [`ListenerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the listener and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Subscribe for SubscribeFn<F>
where
    F: Fn(&StateMap, Option<&StateMap>) + Send + Sync + 'static,
{
    fn on_change(&self, current: &StateMap, previous: Option<&StateMap>) {
        (self.f)(current, previous);
    }

    fn name(&self) -> &str {
        &self.name
    }
}
