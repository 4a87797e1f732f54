//! # State value helpers: projection, merge, diff, validation.
//!
//! Root state and every slice of it are plain JSON objects
//! ([`StateMap`] = `serde_json::Map<String, Value>`). Using `serde_json`
//! values gives the store its two structural collaborators for free:
//! deep clone is `Value: Clone` and deep equality is `Value: PartialEq`
//! (recursive over objects and arrays).
//!
//! Everything in this module is a pure function over owned/borrowed maps;
//! nothing here touches the registry or the dispatcher.

use serde_json::Value;

/// A plain key→value mapping: the shape of root state and of every slice.
pub type StateMap = serde_json::Map<String, Value>;

/// Returns the sub-mapping of `state` restricted to `keys`.
///
/// Keys absent from `state` are omitted from the result (subscribing to a
/// key before it exists in root state is legal; the projection simply skips
/// it until a write introduces it).
///
/// # Example
/// ```
/// use serde_json::json;
/// use slicestore::{take, StateMap};
///
/// let state: StateMap = json!({"a": 1, "b": 2}).as_object().unwrap().clone();
/// let slice = take(&state, ["a", "missing"]);
/// assert_eq!(slice.len(), 1);
/// assert_eq!(slice["a"], json!(1));
/// ```
pub fn take<I, K>(state: &StateMap, keys: I) -> StateMap
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let mut out = StateMap::new();
    for key in keys {
        let key = key.as_ref();
        if let Some(value) = state.get(key) {
            out.insert(key.to_string(), value.clone());
        }
    }
    out
}

/// Produces a new mapping that is the shallow union of `old` and `update`.
///
/// Keys present in `update` overwrite; keys only in `old` are preserved.
/// The inputs are never mutated — each apply replaces root state wholesale,
/// so references taken to the previous root remain valid snapshots.
pub fn merge(old: Option<&StateMap>, update: &StateMap) -> StateMap {
    let mut merged = old.cloned().unwrap_or_default();
    for (key, value) in update {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Returns the keys of `update` whose value is not deep-equal to the value
/// under the same key in `previous`.
///
/// A key absent from `previous` counts as changed. Keys of `previous` that
/// `update` does not mention are never reported — the diff is restricted to
/// the update's own keys.
pub(crate) fn changed_keys(update: &StateMap, previous: &StateMap) -> Vec<String> {
    update
        .iter()
        .filter(|(key, value)| previous.get(*key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Validates that `value` is a plain object (or absent).
///
/// - `Value::Null` → `Ok(None)` — absent state is legal.
/// - `Value::Object(map)` → `Ok(Some(map))`.
/// - anything else → `Err(label)` with the runtime type label, for the
///   caller to wrap in the appropriate [`StoreError`](crate::StoreError)
///   variant.
pub(crate) fn into_object(value: Value) -> Result<Option<StateMap>, &'static str> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(type_label(&other)),
    }
}

/// Short runtime type label for a JSON value, used in error messages.
pub(crate) fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
