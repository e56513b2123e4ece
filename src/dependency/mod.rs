//! Step produce/consume model for a single scenario.

pub mod relation;
pub mod scenario;
pub mod step;

pub use relation::{Relation, relation_of};
pub use scenario::{InterdependentPair, PositionStrategy, ScenarioDependencies};
pub use step::{Category, StepDependency, UNSET_POSITION};
