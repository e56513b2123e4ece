use std::path::PathBuf;

use thiserror::Error;

/// Failures while locating or scanning a scenario's source.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("scenario '{scenario}' not found at {}", .path.display())]
    NotFound { scenario: String, path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{scenario}:{line}: {message}")]
    InvalidAttribute {
        scenario: String,
        line: usize,
        message: String,
    },
}
