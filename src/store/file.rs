use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::store::CrossRunStore;
use crate::store::error::StoreError;

/// Store persisted as one JSON document per run id, so a consumer run can
/// read what a producer run wrote.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl FileStore {
    /// Open the store for `run_id` under `root`, loading any earlier contents.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing store file cannot be read or parsed.
    pub fn open(root: &Path, run_id: &str) -> Result<Self, StoreError> {
        let path = root.join(format!("{run_id}.json"));
        let values = if path.is_file() {
            let text = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?
        } else {
            BTreeMap::new()
        };
        info!(path = %path.display(), keys = values.len(), "opened cross-run store");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(&self.values).map_err(|source| {
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, text).map_err(io_err)
    }
}

impl CrossRunStore for FileStore {
    fn put(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let previous = self.values.insert(key.to_owned(), value);
        if let Err(e) = self.flush() {
            match previous {
                Some(old) => self.values.insert(key.to_owned(), old),
                None => self.values.remove(key),
            };
            return Err(e);
        }
        debug!(key, path = %self.path.display(), "stored value");
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}
