use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dependency::step::StepDependency;

/// How one step relates to another through their produce/consume keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// This step consumes something the other produces.
    DependsOn,
    /// The other step consumes something this one produces.
    DependedOnBy,
    Independent,
    /// Each step consumes something the other produces.
    Interdependent,
}

impl Relation {
    /// The relation seen from the other step.
    pub fn inverse(self) -> Self {
        match self {
            Self::DependsOn => Self::DependedOnBy,
            Self::DependedOnBy => Self::DependsOn,
            other => other,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DependsOn => write!(f, "depends_on"),
            Self::DependedOnBy => write!(f, "depended_on_by"),
            Self::Independent => write!(f, "independent"),
            Self::Interdependent => write!(f, "interdependent"),
        }
    }
}

/// Classify `this` relative to `other`.
pub fn relation_of(this: &StepDependency, other: &StepDependency) -> Relation {
    let other_produces_my_consumes = !other.produces.is_disjoint(&this.consumes);
    let other_consumes_my_produces = !other.consumes.is_disjoint(&this.produces);

    match (other_produces_my_consumes, other_consumes_my_produces) {
        (true, false) => Relation::DependsOn,
        (false, true) => Relation::DependedOnBy,
        (false, false) => Relation::Independent,
        (true, true) => Relation::Interdependent,
    }
}

/// Keys exchanged between two steps, in either direction.
pub fn shared_keys(this: &StepDependency, other: &StepDependency) -> Vec<String> {
    let mut keys: Vec<String> = this
        .consumes
        .intersection(&other.produces)
        .chain(this.produces.intersection(&other.consumes))
        .cloned()
        .collect();
    keys.sort();
    keys.dedup();
    keys
}
