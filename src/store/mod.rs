//! Key/value store that carries produced values from one process run to the next.

pub mod error;
pub mod file;
pub mod memory;

use serde_json::Value;

use crate::dependency::ScenarioDependencies;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Keyed storage shared between producer and consumer runs.
pub trait CrossRunStore {
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn put(&mut self, key: &str, value: Value) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Option<Value>;

    fn keys(&self) -> Vec<String>;

    /// Fetch a value a step depends on.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotProduced`] if no run ever stored `key`.
    fn consume(&self, key: &str) -> Result<Value, StoreError> {
        self.get(key).ok_or_else(|| StoreError::NotProduced {
            key: key.to_owned(),
        })
    }
}

/// Check that every key consumed by the scenario's steps is in the store.
///
/// Run before a consumer run starts, so a broken producer/consumer pairing
/// fails up front instead of midway through the scenario.
///
/// # Errors
///
/// Returns [`StoreError::MissingForStep`] for the first step, in execution
/// order, that consumes an absent key.
pub fn verify_consumable(
    scenario: &ScenarioDependencies,
    store: &dyn CrossRunStore,
) -> Result<(), StoreError> {
    for step in scenario.execution_order() {
        for key in &step.consumes {
            if store.get(key).is_none() {
                return Err(StoreError::MissingForStep {
                    scenario: scenario.name.clone(),
                    step: step.name.clone(),
                    key: key.clone(),
                });
            }
        }
    }
    Ok(())
}
