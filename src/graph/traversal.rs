use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::Direction;
use petgraph::graph::NodeIndex;

use crate::graph::analysis::find_cycle;
use crate::graph::builder::DependencyGraph;

/// Producer-first order. Among ready steps the earliest in execution order wins.
///
/// # Errors
///
/// Returns an error naming the steps of a cycle if one exists.
pub fn dependency_order(dg: &DependencyGraph) -> Result<Vec<NodeIndex>, String> {
    let mut in_degree: Vec<usize> = dg
        .node_indices
        .iter()
        .map(|&idx| {
            dg.graph
                .neighbors_directed(idx, Direction::Incoming)
                .count()
        })
        .collect();

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(dg.node_indices.len());
    while let Some(Reverse(i)) = ready.pop() {
        let node = dg.node_indices[i];
        order.push(node);
        for next in dg.graph.neighbors_directed(node, Direction::Outgoing) {
            let j = next.index();
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.push(Reverse(j));
            }
        }
    }

    if order.len() < dg.node_indices.len() {
        let cycle = find_cycle(dg).unwrap_or_default();
        return Err(format!("cycle detected between steps: {}", cycle.join(" -> ")));
    }
    Ok(order)
}

/// Names of the steps in `order`.
pub fn step_names(dg: &DependencyGraph, order: &[NodeIndex]) -> Vec<String> {
    order.iter().map(|&i| dg.step_name(i).to_owned()).collect()
}
