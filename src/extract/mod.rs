//! Source extraction: turns a scenario's source into its dependency graph.

pub mod error;
pub mod scan;

use std::path::{Path, PathBuf};

use crate::dependency::{PositionStrategy, ScenarioDependencies};

pub use error::ExtractError;
pub use scan::{ScannedScenario, scan};

/// Supplies the dependency graph of a named scenario.
pub trait Extractor {
    /// # Errors
    ///
    /// Returns [`ExtractError::NotFound`] if no source exists for `scenario`.
    fn extract(&self, scenario: &str) -> Result<ScenarioDependencies, ExtractError>;
}

/// Reads scenarios from `<root>/<scenario>.rs`.
#[derive(Debug, Clone)]
pub struct SourceExtractor {
    pub root: PathBuf,
    pub strategy: PositionStrategy,
}

impl SourceExtractor {
    pub fn new(root: impl Into<PathBuf>, strategy: PositionStrategy) -> Self {
        Self {
            root: root.into(),
            strategy,
        }
    }

    pub fn source_path(&self, scenario: &str) -> PathBuf {
        self.root.join(format!("{scenario}.rs"))
    }

    /// Scan a scenario, keeping its lifecycle methods as well.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing, unreadable, or malformed.
    pub fn scan_scenario(&self, scenario: &str) -> Result<ScannedScenario, ExtractError> {
        let path = self.source_path(scenario);
        if !path.is_file() {
            return Err(ExtractError::NotFound {
                scenario: scenario.to_owned(),
                path,
            });
        }
        scan_file(&path, self.strategy)
    }
}

impl Extractor for SourceExtractor {
    fn extract(&self, scenario: &str) -> Result<ScenarioDependencies, ExtractError> {
        self.scan_scenario(scenario).map(|s| s.dependencies)
    }
}

/// Scan one source file; the scenario is named after the file stem.
///
/// # Errors
///
/// Returns an error if the file cannot be read or contains a malformed attribute.
pub fn scan_file(path: &Path, strategy: PositionStrategy) -> Result<ScannedScenario, ExtractError> {
    let scenario = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let source = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_owned(),
        source,
    })?;
    scan(&source, &scenario, strategy)
}
