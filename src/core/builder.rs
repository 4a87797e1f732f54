use serde_json::Value;

use crate::core::config::StoreConfig;
use crate::core::store::Store;
use crate::error::StoreError;
use crate::state::{self, StateMap};

/// Builder for constructing a [`Store`] with optional configuration.
///
/// ## Example
/// ```
/// use serde_json::json;
/// use slicestore::{Store, StoreConfig};
///
/// let store = Store::builder()
///     .with_config(StoreConfig { with_previous_state: true, ..Default::default() })
///     .with_initial(json!({"x": 1}))
///     .build()
///     .unwrap();
/// assert_eq!(store.slice_state(&["x"])["x"], json!(1));
/// ```
pub struct StoreBuilder {
    config: StoreConfig,
    initial: Value,
}

impl StoreBuilder {
    /// Creates a new builder with default configuration and absent initial
    /// state.
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            initial: Value::Null,
        }
    }

    /// Sets the store configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the initial root state.
    ///
    /// Must be a plain object or `null` (absent); anything else makes
    /// [`StoreBuilder::build`] fail.
    pub fn with_initial(mut self, initial: Value) -> Self {
        self.initial = initial;
        self
    }

    /// Validates the initial state and constructs the store.
    ///
    /// Validation happens here, before the store exists, so an invalid
    /// initial value can never be observed by a subscriber.
    pub fn build(self) -> Result<Store, StoreError> {
        let root: Option<StateMap> = state::into_object(self.initial)
            .map_err(|actual| StoreError::InvalidInitialState { actual })?;
        Ok(Store::from_parts(self.config, root))
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
