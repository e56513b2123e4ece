use std::path::PathBuf;

use thiserror::Error;

/// Failures of the cross-run key/value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A consumer asked for a key that no earlier run produced.
    #[error("key '{key}' was consumed but never produced")]
    NotProduced { key: String },

    /// A scenario step consumes a key missing from the store.
    #[error("scenario '{scenario}': step '{step}' consumes '{key}', which no earlier run produced")]
    MissingForStep {
        scenario: String,
        step: String,
        key: String,
    },

    #[error("store i/o failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
