use petgraph::graph::{DiGraph, NodeIndex};

use crate::dependency::{Relation, ScenarioDependencies, StepDependency, relation_of};

/// Keys flowing from a producing step to a consuming step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFlow {
    pub keys: Vec<String>,
}

/// A scenario's produce/consume relations backed by petgraph.
///
/// Nodes are added in execution order, so a lower index means an earlier step.
pub struct DependencyGraph {
    pub name: String,
    pub graph: DiGraph<StepDependency, KeyFlow>,
    pub node_indices: Vec<NodeIndex>,
}

impl DependencyGraph {
    pub fn find(&self, step: &str) -> Option<NodeIndex> {
        self.node_indices
            .iter()
            .find(|&&idx| self.graph[idx].name == step)
            .copied()
    }

    pub fn step_name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].name
    }
}

/// Build a producer -> consumer graph over the scenario's non-lifecycle steps.
pub fn build(scenario: &ScenarioDependencies) -> DependencyGraph {
    let mut graph = DiGraph::new();
    let node_indices: Vec<NodeIndex> = scenario
        .execution_order()
        .into_iter()
        .map(|s| graph.add_node(s.clone()))
        .collect();

    for (i, &from) in node_indices.iter().enumerate() {
        for &to in &node_indices[i + 1..] {
            let (a, b) = (&graph[from], &graph[to]);
            let forward: Vec<String> = a.produces.intersection(&b.consumes).cloned().collect();
            let backward: Vec<String> = b.produces.intersection(&a.consumes).cloned().collect();
            match relation_of(a, b) {
                Relation::DependedOnBy => {
                    graph.add_edge(from, to, KeyFlow { keys: forward });
                }
                Relation::DependsOn => {
                    graph.add_edge(to, from, KeyFlow { keys: backward });
                }
                Relation::Interdependent => {
                    graph.add_edge(from, to, KeyFlow { keys: forward });
                    graph.add_edge(to, from, KeyFlow { keys: backward });
                }
                Relation::Independent => {}
            }
        }
    }

    DependencyGraph {
        name: scenario.name.clone(),
        graph,
        node_indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> ScenarioDependencies {
        let mut sc = ScenarioDependencies::new("Shop");
        sc.record_produce_at("login", "token", 1);
        sc.record_produce_at("browse", "cart", 2);
        sc.record_consume_at("checkout", "token", 3);
        sc.record_consume_at("checkout", "cart", 4);
        sc
    }

    #[test]
    fn builds_empty_graph() {
        let dg = build(&ScenarioDependencies::new("Empty"));
        assert_eq!(dg.graph.node_count(), 0);
        assert_eq!(dg.graph.edge_count(), 0);
    }

    #[test]
    fn nodes_follow_execution_order() {
        let dg = build(&shop());
        let names: Vec<&str> = dg.node_indices.iter().map(|&i| dg.step_name(i)).collect();
        assert_eq!(names, vec!["login", "browse", "checkout"]);
    }

    #[test]
    fn edges_point_from_producer_to_consumer() {
        let dg = build(&shop());
        assert_eq!(dg.graph.edge_count(), 2);
        let checkout = dg.find("checkout").unwrap();
        let login = dg.find("login").unwrap();
        let edge = dg.graph.find_edge(login, checkout).expect("login -> checkout");
        assert_eq!(dg.graph[edge].keys, vec!["token"]);
        assert!(dg.graph.find_edge(checkout, login).is_none());
    }

    #[test]
    fn consumer_declared_first_still_points_backwards() {
        let mut sc = ScenarioDependencies::new("Reversed");
        sc.record_consume_at("verify", "receipt", 1);
        sc.record_produce_at("pay", "receipt", 2);
        let dg = build(&sc);
        let verify = dg.find("verify").unwrap();
        let pay = dg.find("pay").unwrap();
        assert!(dg.graph.find_edge(pay, verify).is_some());
    }

    #[test]
    fn interdependent_steps_get_both_edges() {
        let mut sc = ScenarioDependencies::new("Loop");
        sc.record_produce_at("a", "x", 1);
        sc.record_consume_at("a", "y", 1);
        sc.record_produce_at("b", "y", 2);
        sc.record_consume_at("b", "x", 2);
        let dg = build(&sc);
        assert_eq!(dg.graph.edge_count(), 2);
    }

    #[test]
    fn lifecycle_steps_are_not_nodes() {
        let mut sc = shop();
        sc.add_lifecycle_step("set_up");
        let dg = build(&sc);
        assert_eq!(dg.graph.node_count(), 3);
        assert!(dg.find("set_up").is_none());
    }
}
