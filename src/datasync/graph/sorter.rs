// SPDX-License-Identifier: MIT

//! Kahn topological sort over the node arena
//!
//! Ties are broken by insertion order: the ready queue is seeded in arena order
//! and dependents are released in the order their edges were declared. The
//! same pass serves as the cycle detector for both validation and evaluation.

use super::node::Graph;
use super::types::NodeId;
use std::collections::VecDeque;

/// Outcome of a sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortResult {
    /// Arena indices, every node after all of its inputs
    pub order: Vec<usize>,
    /// Set when some nodes could not be ordered
    pub has_cycle: bool,
}

pub fn sort(graph: &Graph) -> SortResult {
    let count = graph.len();
    let mut in_degree: Vec<usize> = graph.nodes().iter().map(|n| n.inputs().len()).collect();
    let mut queue: VecDeque<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(count);

    while let Some(index) = queue.pop_front() {
        order.push(index);
        for &dependent in graph.dependents(index) {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    SortResult {
        has_cycle: order.len() != count,
        order,
    }
}

/// Ids of the nodes that sit on a cycle
///
/// The nodes left over by the sort are the cycles plus everything downstream
/// of them. Only the strongly connected components among the leftovers with
/// more than one node, and nodes that read themselves, are on a cycle; a node
/// sitting between two cycles is not. Ids come back in arena order.
pub fn cycle_members(graph: &Graph, sorted: &SortResult) -> Vec<NodeId> {
    if !sorted.has_cycle {
        return Vec::new();
    }

    let mut remaining = vec![true; graph.len()];
    for &index in &sorted.order {
        remaining[index] = false;
    }

    let component = components(graph, &remaining);
    let mut sizes = vec![0usize; graph.len()];
    for c in component.iter().flatten() {
        sizes[*c] += 1;
    }

    (0..graph.len())
        .filter(|&i| match component[i] {
            Some(c) => sizes[c] > 1 || graph.at(i).inputs().contains(&i),
            None => false,
        })
        .map(|i| graph.at(i).id())
        .collect()
}

/// Kosaraju over the leftover nodes: finish order along dependents, then
/// components along inputs in reverse finish order
fn components(graph: &Graph, remaining: &[bool]) -> Vec<Option<usize>> {
    let count = graph.len();
    let mut visited = vec![false; count];
    let mut finished = Vec::with_capacity(count);

    for root in (0..count).filter(|&i| remaining[i]) {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack = vec![(root, 0usize)];
        while let Some((index, next)) = stack.pop() {
            match graph.dependents(index).get(next) {
                Some(&child) => {
                    stack.push((index, next + 1));
                    if remaining[child] && !visited[child] {
                        visited[child] = true;
                        stack.push((child, 0));
                    }
                }
                None => finished.push(index),
            }
        }
    }

    let mut component = vec![None; count];
    let mut next_component = 0;
    for &root in finished.iter().rev() {
        if component[root].is_some() {
            continue;
        }
        component[root] = Some(next_component);
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            for &parent in graph.at(index).inputs() {
                if remaining[parent] && component[parent].is_none() {
                    component[parent] = Some(next_component);
                    stack.push(parent);
                }
            }
        }
        next_component += 1;
    }
    component
}
