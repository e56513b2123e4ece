use std::collections::BTreeMap;

use serde_json::Value;

use crate::store::CrossRunStore;
use crate::store::error::StoreError;

/// In-process store; contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CrossRunStore for MemoryStore {
    fn put(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_owned(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}
