use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::phase::lifecycle::{LifecycleKind, LifecycleMethod, PhaseScope};
use crate::phase::{Phase, PhaseContext};

/// A phase-scoped method lacks every lifecycle hook its scope requires.
///
/// Detected before any test executes and never recoverable within the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "method '{method}' is tagged {scope} but carries none of [{}]; actual tags: [{}]",
    .expected.join(", "),
    .actual.join(", ")
)]
pub struct ConfigurationError {
    pub method: String,
    pub scope: &'static str,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

/// Gate deciding whether a lifecycle method runs in the active phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseProcessor {
    Before { skip_in: BTreeSet<Phase> },
    After { skip_in: BTreeSet<Phase> },
    /// The method carries no phase scope and is left to the runner.
    NoOp,
}

impl PhaseProcessor {
    /// Pick the processor variant matching the method's phase scope.
    pub fn for_method(method: &LifecycleMethod) -> Self {
        match &method.scope {
            Some(PhaseScope::BeforePhase(phases)) => Self::Before {
                skip_in: phases.clone(),
            },
            Some(PhaseScope::AfterPhase(phases)) => Self::After {
                skip_in: phases.clone(),
            },
            None => Self::NoOp,
        }
    }

    fn requirement(&self) -> Option<(&'static str, &'static [LifecycleKind])> {
        match self {
            Self::Before { .. } => Some(("before_phase", &LifecycleKind::BEFORE_PHASE_COMPATIBLE)),
            Self::After { .. } => Some(("after_phase", &LifecycleKind::AFTER_PHASE_COMPATIBLE)),
            Self::NoOp => None,
        }
    }

    /// Check that the method carries a lifecycle hook compatible with its scope.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] naming the method and its actual tags.
    pub fn validate(&self, method: &LifecycleMethod) -> Result<(), ConfigurationError> {
        let Some((scope, expected)) = self.requirement() else {
            return Ok(());
        };
        if method.lifecycle.iter().any(|k| expected.contains(k)) {
            return Ok(());
        }
        Err(ConfigurationError {
            method: method.name.clone(),
            scope,
            expected: expected.iter().map(ToString::to_string).collect(),
            actual: method.tags(),
        })
    }

    /// Returns `true` if the method should run in the context's phase.
    ///
    /// The declared phase set names the phases in which the method is skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the method's tags are incompatible.
    pub fn can_process(
        &self,
        method: &LifecycleMethod,
        ctx: &PhaseContext,
    ) -> Result<bool, ConfigurationError> {
        let skip_in = match self {
            Self::NoOp => return Ok(true),
            Self::Before { skip_in } | Self::After { skip_in } => skip_in,
        };
        self.validate(method)?;

        let eligible = !skip_in.contains(&ctx.phase());
        debug!(
            method = %method.name,
            phase = %ctx.phase(),
            eligible,
            "phase gate evaluated"
        );
        Ok(eligible)
    }
}

/// Validate every method up front, collecting all configuration errors.
///
/// # Errors
///
/// Returns every [`ConfigurationError`] found, in method order.
pub fn validate_methods(methods: &[LifecycleMethod]) -> Result<(), Vec<ConfigurationError>> {
    let errors: Vec<ConfigurationError> = methods
        .iter()
        .filter_map(|m| PhaseProcessor::for_method(m).validate(m).err())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        for e in &errors {
            warn!("{e}");
        }
        Err(errors)
    }
}
