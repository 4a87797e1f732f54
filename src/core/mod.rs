//! Store core: state ownership, subscription bookkeeping, dispatch.
//!
//! Public API from this module: [`Store`], [`StoreBuilder`], [`StoreConfig`],
//! [`SubscribeOptions`], [`SliceHandle`] and [`SubscriberId`].
//!
//! Internal modules:
//! - [`registry`]: per-key listener sets plus the watched-key reverse index;
//! - [`channel`]: the per-subscriber update channel (internal notify) and
//!   the caller-facing slice handle;
//! - [`store`]: root state, the apply step and the dispatcher;
//! - [`config`] / [`builder`]: construction-time configuration.

mod builder;
mod channel;
mod config;
mod registry;
mod store;

pub use builder::StoreBuilder;
pub use channel::SliceHandle;
pub use config::{StoreConfig, SubscribeOptions};
pub use registry::SubscriberId;
pub use store::Store;
