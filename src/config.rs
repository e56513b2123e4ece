use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dependency::PositionStrategy;
use crate::phase::{Phase, phase_from_lookup};

/// Default cap on generated orderings: 8!.
pub const DEFAULT_MAX_PERMUTATIONS: u64 = 40_320;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{0}")]
    InvalidPhase(String),
}

/// Engine settings, loadable from YAML. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub position_strategy: PositionStrategy,
    /// Largest number of orderings a permutational plan may contain.
    pub max_permutations: u64,
    /// Drop orderings that run a consumer before its producer.
    pub respect_dependencies: bool,
    pub phase: Phase,
    /// Directory holding cross-run store files.
    pub store_root: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            position_strategy: PositionStrategy::SourceLine,
            max_permutations: DEFAULT_MAX_PERMUTATIONS,
            respect_dependencies: true,
            phase: Phase::NonPhased,
            store_root: None,
        }
    }
}

impl EngineConfig {
    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Returns the YAML error if the document is malformed or has unknown fields.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Load a YAML config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Override the phase from `PHASED_PHASE` when it is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable names an unknown phase.
    pub fn apply_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(phase) = phase_from_lookup(lookup).map_err(ConfigError::InvalidPhase)? {
            self.phase = phase;
        }
        Ok(self)
    }
}
