//! # Example: hand-implemented listener with previous-state delivery
//!
//! Run with: `cargo run --example custom_subscriber`

use std::sync::Arc;

use serde_json::json;
use slicestore::{StateMap, Store, Subscribe, SubscribeOptions};

/// Prints a diff-style line for every notification.
struct DiffPrinter;

impl Subscribe for DiffPrinter {
    fn on_change(&self, current: &StateMap, previous: Option<&StateMap>) {
        for (key, value) in current {
            let before = previous.and_then(|previous| previous.get(key));
            match before {
                Some(before) if before != value => {
                    println!("[diff] {key}: {before} -> {value}");
                }
                None => println!("[diff] {key}: (absent) -> {value}"),
                _ => {}
            }
        }
    }

    fn name(&self) -> &str {
        "diff_printer"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::with_initial(json!({"temperature": 20, "humidity": 40}))?;

    let _handle = store.subscribe_with(
        &["temperature", "humidity"],
        Arc::new(DiffPrinter),
        SubscribeOptions {
            with_previous_state: true,
        },
    );

    store.set(json!({"temperature": 21}))?;
    store.set(json!({"temperature": 21, "humidity": 55}))?; // only humidity moved
    store.set(json!({"pressure": 1013}))?; // unwatched key: silence

    Ok(())
}
