//! # Simple logging listener for debugging and demos.
//!
//! [`LogWriter`] prints every notification it receives to stdout in a
//! human-readable format.
//!
//! ## Output format
//! ```text
//! [update] current={"x":5}
//! [update] current={"x":6} previous={"x":5}
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use slicestore::{LogWriter, Store};
//! let store = Store::new();
//! let handle = store.subscribe(&["x"], Arc::new(LogWriter));
//! // every change to "x" is now printed to stdout
//! ```

use crate::state::StateMap;
use crate::subscribers::Subscribe;

/// Simple stdout logging listener.
///
/// Enabled via the `logging` feature. Prints the current (and, when
/// configured, previous) slice for every notification.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

impl Subscribe for LogWriter {
    fn on_change(&self, current: &StateMap, previous: Option<&StateMap>) {
        match previous {
            Some(previous) => {
                println!(
                    "[update] current={} previous={}",
                    serde_json::Value::Object(current.clone()),
                    serde_json::Value::Object(previous.clone()),
                );
            }
            None => {
                println!("[update] current={}", serde_json::Value::Object(current.clone()));
            }
        }
    }

    fn name(&self) -> &str {
        "log_writer"
    }
}
