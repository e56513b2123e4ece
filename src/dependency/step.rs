use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Position of a step that has never been placed.
pub const UNSET_POSITION: i64 = -1;

/// The declared produce/consume keys of one step within a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDependency {
    pub name: String,
    /// Source line of the latest recorded call site, or a synthetic counter.
    pub position: i64,
    pub produces: BTreeSet<String>,
    pub consumes: BTreeSet<String>,
    /// Setup/teardown methods never take part in ordering or permutation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_lifecycle_method: bool,
}

impl StepDependency {
    /// Create an empty step with an unset position.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: UNSET_POSITION,
            produces: BTreeSet::new(),
            consumes: BTreeSet::new(),
            is_lifecycle_method: false,
        }
    }

    /// Add a produced key. Returns `false` if it was already present.
    pub fn add_produce(&mut self, key: impl Into<String>) -> bool {
        self.produces.insert(key.into())
    }

    /// Add a consumed key. Returns `false` if it was already present.
    pub fn add_consume(&mut self, key: impl Into<String>) -> bool {
        self.consumes.insert(key.into())
    }

    pub fn has_position(&self) -> bool {
        self.position != UNSET_POSITION
    }

    /// Classify this step by which of its key sets are populated.
    pub fn category(&self) -> Category {
        match (self.produces.is_empty(), self.consumes.is_empty()) {
            (true, true) => Category::Independent,
            (false, true) => Category::ProducerOnly,
            (true, false) => Category::ConsumerOnly,
            (false, false) => Category::ProducerConsumer,
        }
    }
}

// Identity is (name, position): the same name seen at two positions is two entities.
impl PartialEq for StepDependency {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.position == other.position
    }
}

impl Eq for StepDependency {}

impl Hash for StepDependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.position.hash(state);
    }
}

/// Shape of a single step's produce/consume sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Independent,
    ProducerOnly,
    ConsumerOnly,
    ProducerConsumer,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Independent => write!(f, "independent"),
            Self::ProducerOnly => write!(f, "producer_only"),
            Self::ConsumerOnly => write!(f, "consumer_only"),
            Self::ProducerConsumer => write!(f, "producer_consumer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn new_step_is_empty_and_unplaced() {
        let step = StepDependency::new("login");
        assert_eq!(step.name, "login");
        assert_eq!(step.position, UNSET_POSITION);
        assert!(!step.has_position());
        assert!(step.produces.is_empty());
        assert!(step.consumes.is_empty());
        assert!(!step.is_lifecycle_method);
    }

    #[test]
    fn duplicate_keys_are_ignored() {
        let mut step = StepDependency::new("login");
        assert!(step.add_produce("token"));
        assert!(!step.add_produce("token"));
        assert!(step.add_consume("user"));
        assert!(!step.add_consume("user"));
        assert_eq!(step.produces.len(), 1);
        assert_eq!(step.consumes.len(), 1);
    }

    // ── Category ───────────────────────────────────────────

    #[test]
    fn category_covers_all_four_shapes() {
        let mut step = StepDependency::new("s");
        assert_eq!(step.category(), Category::Independent);

        step.add_produce("a");
        assert_eq!(step.category(), Category::ProducerOnly);

        step.add_consume("b");
        assert_eq!(step.category(), Category::ProducerConsumer);

        let mut consumer = StepDependency::new("c");
        consumer.add_consume("a");
        assert_eq!(consumer.category(), Category::ConsumerOnly);
    }

    // ── Identity ───────────────────────────────────────────

    #[test]
    fn equality_uses_name_and_position_only() {
        let mut a = StepDependency::new("checkout");
        a.position = 10;
        let mut b = StepDependency::new("checkout");
        b.position = 10;
        b.add_consume("token");
        assert_eq!(a, b);

        b.position = 11;
        assert_ne!(a, b);
    }

    #[test]
    fn hash_agrees_with_equality() {
        let mut a = StepDependency::new("checkout");
        a.position = 3;
        let mut b = a.clone();
        b.add_produce("receipt");

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }
}
