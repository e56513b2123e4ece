use std::collections::HashMap;
use std::fmt;

use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dependency::relation::{Relation, relation_of, shared_keys};
use crate::dependency::step::{StepDependency, UNSET_POSITION};

/// How a step's `position` is computed when a call site carries no line number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionStrategy {
    /// Positions come from source lines; calls without one leave it alone.
    #[default]
    SourceLine,
    /// Every produce/consume call moves the step to `last_step_position() + 1`.
    Synthetic,
}

impl fmt::Display for PositionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceLine => write!(f, "source-line"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Two steps that each consume something the other produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterdependentPair {
    pub first: String,
    pub second: String,
    pub keys: Vec<String>,
}

/// All step dependencies of one scenario, keyed by step name.
///
/// Every mutator creates the named step on first use.
#[derive(Debug, Clone)]
pub struct ScenarioDependencies {
    pub name: String,
    strategy: PositionStrategy,
    steps: Vec<StepDependency>,
    index: HashMap<String, usize>,
}

impl ScenarioDependencies {
    /// Create an empty scenario using source-line positions.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_strategy(name, PositionStrategy::SourceLine)
    }

    pub fn with_strategy(name: impl Into<String>, strategy: PositionStrategy) -> Self {
        Self {
            name: name.into(),
            strategy,
            steps: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn strategy(&self) -> PositionStrategy {
        self.strategy
    }

    /// Ensure a step exists. An existing step is returned untouched.
    pub fn add_step(&mut self, step: &str) -> &mut StepDependency {
        let idx = match self.index.get(step) {
            Some(&idx) => idx,
            None => {
                debug!(scenario = %self.name, step, "adding step");
                self.steps.push(StepDependency::new(step));
                self.index.insert(step.to_owned(), self.steps.len() - 1);
                self.steps.len() - 1
            }
        };
        &mut self.steps[idx]
    }

    /// Ensure a step exists and mark it as a setup/teardown method.
    pub fn add_lifecycle_step(&mut self, step: &str) -> &mut StepDependency {
        let entry = self.add_step(step);
        entry.is_lifecycle_method = true;
        entry
    }

    pub fn record_produce(&mut self, step: &str, key: &str) {
        let next = self.next_synthetic_position();
        let entry = self.add_step(step);
        entry.add_produce(key);
        if let Some(position) = next {
            entry.position = position;
        }
    }

    pub fn record_produce_at(&mut self, step: &str, key: &str, position: i64) {
        let entry = self.add_step(step);
        entry.add_produce(key);
        entry.position = position;
    }

    pub fn record_consume(&mut self, step: &str, key: &str) {
        let next = self.next_synthetic_position();
        let entry = self.add_step(step);
        entry.add_consume(key);
        if let Some(position) = next {
            entry.position = position;
        }
    }

    pub fn record_consume_at(&mut self, step: &str, key: &str, position: i64) {
        let entry = self.add_step(step);
        entry.add_consume(key);
        entry.position = position;
    }

    fn next_synthetic_position(&self) -> Option<i64> {
        match self.strategy {
            PositionStrategy::SourceLine => None,
            PositionStrategy::Synthetic => Some(self.last_step_position() + 1),
        }
    }

    pub fn get_step(&self, step: &str) -> Option<&StepDependency> {
        self.index.get(step).map(|&idx| &self.steps[idx])
    }

    /// All steps in insertion order, lifecycle methods included.
    pub fn steps(&self) -> &[StepDependency] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Scenario steps sorted by ascending position, ties kept in insertion order.
    pub fn execution_order(&self) -> Vec<&StepDependency> {
        let mut order: Vec<&StepDependency> = self
            .steps
            .iter()
            .filter(|s| !s.is_lifecycle_method)
            .collect();
        order.sort_by_key(|s| s.position);
        order
    }

    /// Highest position among all steps, or [`UNSET_POSITION`] when empty.
    pub fn last_step_position(&self) -> i64 {
        self.steps
            .iter()
            .map(|s| s.position)
            .max()
            .unwrap_or(UNSET_POSITION)
    }

    /// Relation of step `this` to step `other`, if both exist.
    pub fn relation(&self, this: &str, other: &str) -> Option<Relation> {
        Some(relation_of(self.get_step(this)?, self.get_step(other)?))
    }

    /// Every pair of scenario steps that depend on each other.
    pub fn interdependent_pairs(&self) -> Vec<InterdependentPair> {
        let order = self.execution_order();
        let mut pairs = Vec::new();
        for (i, a) in order.iter().enumerate() {
            for b in &order[i + 1..] {
                if relation_of(a, b) == Relation::Interdependent {
                    pairs.push(InterdependentPair {
                        first: a.name.clone(),
                        second: b.name.clone(),
                        keys: shared_keys(a, b),
                    });
                }
            }
        }
        pairs
    }

    /// Partition scenario steps into groups that exchange no keys with each other.
    ///
    /// Groups and their members follow execution order.
    pub fn independent_groups(&self) -> Vec<Vec<&StepDependency>> {
        let order = self.execution_order();
        let mut sets = UnionFind::<usize>::new(order.len());
        for (i, a) in order.iter().enumerate() {
            for (j, b) in order.iter().enumerate().skip(i + 1) {
                if relation_of(a, b) != Relation::Independent {
                    sets.union(i, j);
                }
            }
        }

        let mut groups: Vec<Vec<&StepDependency>> = Vec::new();
        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        for (i, step) in order.iter().enumerate() {
            let root = sets.find(i);
            let slot = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(*step);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(steps: &[&StepDependency]) -> Vec<String> {
        steps.iter().map(|s| s.name.clone()).collect()
    }

    // ── Add-if-absent ──────────────────────────────────────

    #[test]
    fn record_produce_creates_unknown_step() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.record_produce("login", "token");
        let step = sc.get_step("login").expect("step should exist");
        assert!(step.produces.contains("token"));
        assert!(step.consumes.is_empty());
    }

    #[test]
    fn record_consume_creates_unknown_step() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.record_consume("checkout", "token");
        let step = sc.get_step("checkout").expect("step should exist");
        assert!(step.consumes.contains("token"));
    }

    #[test]
    fn add_step_keeps_existing_data() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.record_produce_at("login", "token", 4);
        sc.add_step("login");
        let step = sc.get_step("login").unwrap();
        assert!(step.produces.contains("token"));
        assert_eq!(step.position, 4);
        assert_eq!(sc.len(), 1);
    }

    #[test]
    fn add_step_creates_empty_step() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.add_step("browse");
        let step = sc.get_step("browse").unwrap();
        assert!(step.produces.is_empty());
        assert!(step.consumes.is_empty());
        assert_eq!(step.position, UNSET_POSITION);
    }

    #[test]
    fn get_step_unknown_is_none() {
        let sc = ScenarioDependencies::new("Shop");
        assert!(sc.get_step("nope").is_none());
        assert!(sc.is_empty());
    }

    #[test]
    fn duplicate_records_do_not_duplicate_keys() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.record_produce("login", "token");
        sc.record_produce("login", "token");
        assert_eq!(sc.get_step("login").unwrap().produces.len(), 1);
    }

    // ── Positions ──────────────────────────────────────────

    #[test]
    fn source_line_positions_overwrite_with_latest() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.record_produce_at("login", "token", 12);
        sc.record_consume_at("login", "user", 9);
        assert_eq!(sc.get_step("login").unwrap().position, 9);
    }

    #[test]
    fn source_line_strategy_ignores_unpositioned_calls() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.record_produce_at("login", "token", 12);
        sc.record_consume("login", "user");
        assert_eq!(sc.get_step("login").unwrap().position, 12);
    }

    #[test]
    fn synthetic_strategy_counts_calls() {
        let mut sc = ScenarioDependencies::with_strategy("Shop", PositionStrategy::Synthetic);
        sc.record_produce("login", "token");
        sc.record_produce("cart", "items");
        sc.record_consume("checkout", "token");
        assert_eq!(sc.get_step("login").unwrap().position, 0);
        assert_eq!(sc.get_step("cart").unwrap().position, 1);
        assert_eq!(sc.get_step("checkout").unwrap().position, 2);

        sc.record_consume("checkout", "items");
        assert_eq!(sc.get_step("checkout").unwrap().position, 3);
        assert_eq!(sc.last_step_position(), 3);
    }

    #[test]
    fn synthetic_strategy_continues_after_explicit_positions() {
        let mut sc = ScenarioDependencies::with_strategy("Shop", PositionStrategy::Synthetic);
        sc.record_produce_at("login", "token", 20);
        sc.record_consume("checkout", "token");
        assert_eq!(sc.get_step("checkout").unwrap().position, 21);
    }

    #[test]
    fn last_step_position_empty_is_sentinel() {
        let sc = ScenarioDependencies::new("Shop");
        assert_eq!(sc.last_step_position(), UNSET_POSITION);
    }

    // ── Execution order ────────────────────────────────────

    #[test]
    fn execution_order_sorts_by_position() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.record_produce_at("c", "x", 5);
        sc.record_produce_at("a", "y", 1);
        sc.record_produce_at("b", "z", 3);
        assert_eq!(names(&sc.execution_order()), vec!["a", "b", "c"]);
    }

    #[test]
    fn execution_order_ties_keep_insertion_order() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.record_produce_at("second", "x", 2);
        sc.record_produce_at("first", "y", 2);
        sc.record_produce_at("zero", "z", 1);
        assert_eq!(
            names(&sc.execution_order()),
            vec!["zero", "second", "first"]
        );
    }

    #[test]
    fn execution_order_excludes_lifecycle_methods() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.add_lifecycle_step("set_up");
        sc.record_produce_at("set_up", "db", 1);
        sc.record_consume_at("query", "db", 5);
        assert_eq!(names(&sc.execution_order()), vec!["query"]);
        assert_eq!(sc.last_step_position(), 5);
    }

    // ── Relations and grouping ─────────────────────────────

    #[test]
    fn relation_by_name() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.record_produce("login", "token");
        sc.record_consume("checkout", "token");
        sc.record_consume("checkout", "cart");
        assert_eq!(
            sc.relation("checkout", "login"),
            Some(Relation::DependsOn)
        );
        assert_eq!(sc.relation("checkout", "missing"), None);
    }

    #[test]
    fn interdependent_pairs_are_reported() {
        let mut sc = ScenarioDependencies::new("Loop");
        sc.record_produce_at("a", "x", 1);
        sc.record_consume_at("a", "y", 2);
        sc.record_produce_at("b", "y", 3);
        sc.record_consume_at("b", "x", 4);
        sc.record_produce_at("c", "z", 5);

        let pairs = sc.interdependent_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first, "a");
        assert_eq!(pairs[0].second, "b");
        assert_eq!(pairs[0].keys, vec!["x", "y"]);
    }

    #[test]
    fn independent_groups_split_unrelated_steps() {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.record_produce_at("login", "token", 1);
        sc.record_produce_at("browse", "cart", 2);
        sc.record_consume_at("checkout", "token", 3);
        sc.record_produce_at("audit", "log", 4);

        let groups: Vec<Vec<String>> = sc
            .independent_groups()
            .iter()
            .map(|g| names(g))
            .collect();
        assert_eq!(
            groups,
            vec![
                vec!["login".to_owned(), "checkout".to_owned()],
                vec!["browse".to_owned()],
                vec!["audit".to_owned()],
            ]
        );
    }

    #[test]
    fn independent_groups_join_transitively() {
        let mut sc = ScenarioDependencies::new("Chain");
        sc.record_produce_at("a", "x", 1);
        sc.record_consume_at("c", "y", 3);
        sc.record_consume_at("b", "x", 2);
        sc.record_produce_at("b", "y", 2);

        let groups = sc.independent_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(names(&groups[0]), vec!["a", "b", "c"]);
    }

    #[test]
    fn independent_groups_empty_scenario() {
        let sc = ScenarioDependencies::new("Empty");
        assert!(sc.independent_groups().is_empty());
    }
}
