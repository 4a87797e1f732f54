//! # slicestore
//!
//! **Slicestore** is a key-sliced, observer-based state container for Rust.
//!
//! A store owns a single root mapping from field key to value. Subscribers
//! register interest in a subset of the fields (their *slice*) and are
//! notified only when a field they watch actually changes - redundant
//! writes are detected with deep equality and suppressed, and an update
//! that touches several watched fields still notifies each subscriber
//! exactly once.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Subscriber  │   │  Subscriber  │   │  Subscriber  │
//!     │ (watches x)  │   │(watches x,y) │   │ (watches z)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Store                                                            │
//! │  - Root state (replaced wholesale per update, never mutated)      │
//! │  - Registry (per-key listener sets + watched-key reverse index)   │
//! │  - Notification queue (SubscriberId → UpdateChannel)              │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                │ set({x: 5, y: 9})
//!                                ▼
//!                     apply: merge into root,
//!                     changed = keys whose value moved
//!                                │
//!                                ▼
//!                     dispatch(changed):
//!                     impacted = ∪ registry[key]   (set union ⇒ dedup)
//!                                │
//!                 ┌──────────────┼──────────────┐
//!                 ▼              ▼              ▼
//!          channel.notify  channel.notify   (not impacted:
//!                 │              │            no call at all)
//!                 ▼              ▼
//!          on_change(cur)  on_change(cur)
//! ```
//!
//! ### Write lifecycle
//! ```text
//! Store::set(update) / SliceHandle::set(update)
//!   ├─► validate: plain object? (error names the runtime type, nothing mutated)
//!   ├─► (handle only) filter to watched keys, diff against cached slice
//!   ├─► merge: root = shallow union(root, update)   — old root stays a snapshot
//!   ├─► changed = keys whose root value is not deep-equal to before
//!   └─► dispatch(changed)
//!         ├─► impacted-subscriber set (union over per-key registry entries)
//!         └─► for each impacted channel, exactly once: notify()
//!               ├─► current = projection of root onto watched keys
//!               ├─► listener.on_change(current, previous?)   — inline, synchronous
//!               └─► cache current as the new previous slice
//! ```
//!
//! Listener callbacks run synchronously during dispatch. A callback that
//! itself writes into the store re-enters the apply/dispatch cycle as a
//! nested call - each `set` fully completes its own merge+dispatch before
//! returning, so re-entrant writes nest rather than interleave.
//!
//! ## Features
//! | Area               | Description                                                      | Key types / traits                      |
//! |--------------------|------------------------------------------------------------------|-----------------------------------------|
//! | **Subscriptions**  | Watch a slice of fields, unsubscribe per key.                    | [`Store::subscribe`], [`SliceHandle`]   |
//! | **Listeners**      | Trait-based or closure-based change handlers.                    | [`Subscribe`], [`SubscribeFn`]          |
//! | **Writes**         | Root-level or slice-level, literal or updater-function.          | [`Store::set`], [`SliceHandle::set_with`] |
//! | **Change control** | Previous-slice delivery, no-op write policy.                     | [`StoreConfig`], [`SubscribeOptions`]   |
//! | **Errors**         | Shape validation naming the offending runtime type.              | [`StoreError`]                          |
//! | **State helpers**  | Projection and shallow immutable merge over plain JSON objects.  | [`take`], [`merge`], [`StateMap`]       |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use slicestore::{Store, SubscribeFn};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::with_initial(json!({"x": 1, "y": 2}))?;
//!
//!     let handle = store.subscribe(
//!         &["x"],
//!         SubscribeFn::arc("x-watcher", |current, _previous| {
//!             println!("x changed: {:?}", current.get("x"));
//!         }),
//!     );
//!
//!     store.set(json!({"x": 1, "y": 9}))?; // x unchanged ⇒ no notification
//!     store.set(json!({"x": 5}))?;         // one notification with {"x": 5}
//!
//!     handle.unsubscribe(["x"]);
//!     store.set(json!({"x": 6}))?;         // no notification any more
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod state;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    SliceHandle, Store, StoreBuilder, StoreConfig, SubscribeOptions, SubscriberId,
};
pub use error::StoreError;
pub use state::{merge, take, StateMap};
pub use subscribers::{ListenerRef, Subscribe, SubscribeFn};

// Re-export the value type callers build state from.
pub use serde_json::Value;

// Optional: expose a simple built-in logging listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
