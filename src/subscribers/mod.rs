//! # Slice-change listeners.
//!
//! This module provides the [`Subscribe`] trait implemented by everything
//! that wants to be notified when its slice of root state changes, plus the
//! closure adapter [`SubscribeFn`] for ad-hoc listeners.
//!
//! ## Architecture
//! ```text
//! Notification flow:
//!   Store::set / SliceHandle::set ── apply ──► dispatch(changed keys)
//!                                                  │
//!                                     impacted-set │ (union over per-key
//!                                                  │  registry entries)
//!                                                  ▼
//!                                      UpdateChannel::notify()
//!                                                  │
//!                                                  ▼
//!                                      Subscribe::on_change(current, prev?)
//! ```
//!
//! Listeners run synchronously, inline with the write. A listener is
//! notified at most once per update no matter how many of its watched keys
//! that update changed.

mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use subscribe::{ListenerRef, Subscribe, SubscribeFn};

#[cfg(feature = "logging")]
pub use log::LogWriter;
