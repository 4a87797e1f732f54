//! # Example: basic subscribe/update flow
//!
//! Run with: `cargo run --example basic`

use serde_json::json;
use slicestore::{Store, SubscribeFn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::with_initial(json!({"x": 1, "y": 2}))?;

    let handle = store.subscribe(
        &["x"],
        SubscribeFn::arc("x-watcher", |current, _previous| {
            println!("[x-watcher] slice = {:?}", current);
        }),
    );

    println!("initial slice: {:?}", handle.get());

    // x is unchanged and y is not watched: no notification.
    store.set(json!({"x": 1, "y": 9}))?;

    // x actually changes: one notification.
    store.set(json!({"x": 5}))?;

    // Writes can also go through the handle, including updater-function form.
    handle.set_with(|previous| {
        let x = previous["x"].as_i64().unwrap_or(0);
        json!({"x": x + 1})
    })?;

    handle.unsubscribe(["x"]);
    store.set(json!({"x": 100}))?; // silence: the key was revoked

    println!("final root: {:?}", store.root_state());
    Ok(())
}
