//! Error types used by the store.
//!
//! There is a single error enum, [`StoreError`], covering the only failure
//! class the store has: a caller handing in state that is not a plain
//! key-value mapping. Every variant names the runtime type that was actually
//! supplied.
//!
//! Writes and unsubscribes that reference keys the recipient does not watch,
//! or keys absent from root state, are **not** errors — they are accepted as
//! silent no-ops. Validation always happens before any merge, so a failed
//! call leaves the store untouched.

use thiserror::Error;

/// # Errors produced by the store.
///
/// All variants are shape errors: the supplied value was neither absent/null
/// nor a plain object. There are no retryable failures and no
/// partial-failure states.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Initial state passed at construction was not a plain object.
    #[error("expected the initial state to be an object, got {actual}")]
    InvalidInitialState {
        /// Runtime type label of the supplied value (e.g. `"number"`).
        actual: &'static str,
    },

    /// An update payload (root-level or channel write) was not a plain object.
    #[error("expected the state update to be an object, got {actual}")]
    InvalidUpdate {
        /// Runtime type label of the supplied value (e.g. `"array"`).
        actual: &'static str,
    },
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use slicestore::StoreError;
    ///
    /// let err = StoreError::InvalidUpdate { actual: "string" };
    /// assert_eq!(err.as_label(), "invalid_update");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::InvalidInitialState { .. } => "invalid_initial_state",
            StoreError::InvalidUpdate { .. } => "invalid_update",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StoreError::InvalidInitialState { actual } => {
                format!("invalid initial state: got {actual}, expected object")
            }
            StoreError::InvalidUpdate { actual } => {
                format!("invalid update: got {actual}, expected object")
            }
        }
    }
}
