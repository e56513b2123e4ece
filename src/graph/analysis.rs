use std::collections::HashSet;

use petgraph::Direction;
use petgraph::graph::NodeIndex;

use crate::graph::builder::DependencyGraph;

/// Find a dependency cycle, returning the step names along it.
/// Returns `None` if the graph is acyclic.
pub fn find_cycle(dg: &DependencyGraph) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();
    let mut stack_path = Vec::new();

    for &start in &dg.node_indices {
        if !visited.contains(&start)
            && let Some(cycle) =
                dfs_find_cycle(dg, start, &mut visited, &mut in_stack, &mut stack_path)
        {
            return Some(cycle);
        }
    }

    None
}

fn dfs_find_cycle(
    dg: &DependencyGraph,
    node: NodeIndex,
    visited: &mut HashSet<NodeIndex>,
    in_stack: &mut HashSet<NodeIndex>,
    stack_path: &mut Vec<NodeIndex>,
) -> Option<Vec<String>> {
    visited.insert(node);
    in_stack.insert(node);
    stack_path.push(node);

    for neighbor in dg.graph.neighbors_directed(node, Direction::Outgoing) {
        if !visited.contains(&neighbor) {
            if let Some(cycle) = dfs_find_cycle(dg, neighbor, visited, in_stack, stack_path) {
                return Some(cycle);
            }
        } else if in_stack.contains(&neighbor)
            && let Some(cycle_start) = stack_path.iter().position(|&n| n == neighbor)
        {
            return Some(
                stack_path[cycle_start..]
                    .iter()
                    .map(|&idx| dg.graph[idx].name.clone())
                    .collect(),
            );
        }
    }

    stack_path.pop();
    in_stack.remove(&node);
    None
}

/// Returns `true` if every producer appears before each of its consumers in `order`.
///
/// Names absent from `order` are ignored.
pub fn respects_dependencies<S: AsRef<str>>(dg: &DependencyGraph, order: &[S]) -> bool {
    let mut rank = vec![None; dg.graph.node_count()];
    for (i, name) in order.iter().enumerate() {
        if let Some(idx) = dg.find(name.as_ref()) {
            rank[idx.index()] = Some(i);
        }
    }
    dg.graph.edge_indices().all(|edge| {
        let Some((from, to)) = dg.graph.edge_endpoints(edge) else {
            return true;
        };
        match (rank[from.index()], rank[to.index()]) {
            (Some(p), Some(c)) => p < c,
            _ => true,
        }
    })
}
