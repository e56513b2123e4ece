//! Phases of a multi-run scenario and the gate deciding which lifecycle
//! methods run in the active one.

pub mod lifecycle;
pub mod processor;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use lifecycle::{LifecycleKind, LifecycleMethod, PhaseScope};
pub use processor::{ConfigurationError, PhaseProcessor, validate_methods};

/// Environment variable naming the phase of the current process run.
pub const PHASE_ENV: &str = "PHASED_PHASE";

/// The role a process run plays within a multi-run scenario.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Producer,
    Consumer,
    #[default]
    NonPhased,
    Permutational,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Producer,
        Phase::Consumer,
        Phase::NonPhased,
        Phase::Permutational,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => write!(f, "producer"),
            Self::Consumer => write!(f, "consumer"),
            Self::NonPhased => write!(f, "non_phased"),
            Self::Permutational => write!(f, "permutational"),
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "producer" => Ok(Self::Producer),
            "consumer" => Ok(Self::Consumer),
            "non_phased" | "nonphased" => Ok(Self::NonPhased),
            "permutational" => Ok(Self::Permutational),
            other => Err(format!(
                "unknown phase '{other}' (expected: producer, consumer, non_phased, permutational)"
            )),
        }
    }
}

/// Phase named by [`PHASE_ENV`], or `None` when it is unset or blank.
///
/// # Errors
///
/// Returns an error if the variable is set to an unknown phase.
pub fn phase_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<Phase>, String> {
    match lookup(PHASE_ENV) {
        Some(value) if !value.trim().is_empty() => value
            .parse()
            .map(Some)
            .map_err(|e| format!("{PHASE_ENV}: {e}")),
        _ => Ok(None),
    }
}

/// Execution context threaded into phase-dependent decisions.
///
/// Built once per process run before any test executes and never mutated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseContext {
    phase: Phase,
}

impl PhaseContext {
    pub fn new(phase: Phase) -> Self {
        Self { phase }
    }

    /// Read the phase from [`PHASE_ENV`], defaulting to [`Phase::NonPhased`].
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is set to an unknown phase.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`PhaseContext::from_env`], with an injectable variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is set to an unknown phase.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        Ok(phase_from_lookup(lookup)?.map(Self::new).unwrap_or_default())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_parses_loosely() {
        assert_eq!("producer".parse::<Phase>(), Ok(Phase::Producer));
        assert_eq!("CONSUMER".parse::<Phase>(), Ok(Phase::Consumer));
        assert_eq!("non-phased".parse::<Phase>(), Ok(Phase::NonPhased));
        assert_eq!("NON_PHASED".parse::<Phase>(), Ok(Phase::NonPhased));
        assert_eq!(" permutational ".parse::<Phase>(), Ok(Phase::Permutational));
    }

    #[test]
    fn phase_rejects_unknown() {
        let err = "sideways".parse::<Phase>().unwrap_err();
        assert!(err.contains("sideways"), "got: {err}");
    }

    #[test]
    fn phase_display_round_trips() {
        for phase in Phase::ALL {
            assert_eq!(phase.to_string().parse::<Phase>(), Ok(phase));
        }
    }

    #[test]
    fn context_defaults_to_non_phased() {
        let ctx = PhaseContext::from_lookup(|_| None).unwrap();
        assert_eq!(ctx.phase(), Phase::NonPhased);

        let blank = PhaseContext::from_lookup(|_| Some("  ".into())).unwrap();
        assert_eq!(blank.phase(), Phase::NonPhased);
    }

    #[test]
    fn context_reads_phase_variable() {
        let ctx = PhaseContext::from_lookup(|name| {
            (name == PHASE_ENV).then(|| "consumer".to_owned())
        })
        .unwrap();
        assert_eq!(ctx.phase(), Phase::Consumer);
    }

    #[test]
    fn unset_variable_names_no_phase() {
        assert_eq!(phase_from_lookup(|_| None), Ok(None));
        assert_eq!(phase_from_lookup(|_| Some(String::new())), Ok(None));
        assert_eq!(
            phase_from_lookup(|_| Some("producer".into())),
            Ok(Some(Phase::Producer))
        );
    }

    #[test]
    fn context_rejects_bad_variable() {
        let err = PhaseContext::from_lookup(|_| Some("later".into())).unwrap_err();
        assert!(err.contains(PHASE_ENV), "got: {err}");
    }
}
