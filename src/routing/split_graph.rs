/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Node-split residual graph used by the disjoint-path router.
//!
//! Every node other than the source and the target is replaced by an "in" half and an "out" half
//! joined by a zero-weight internal edge. Incoming edges are redirected to the in half and outgoing
//! edges leave from the out half, so that a node can carry at most one unit of flow. This turns the
//! vertex-disjointness requirement into edge-disjointness on the split graph.
//!
//! Split nodes live in their own arena and refer to the node they were split from by its [`NodeId`],
//! never by reference.

use std::collections::HashMap;

use crate::graph::Graph;
use crate::types::NodeId;

use super::RoutingError;

/// Relative tolerance used when comparing path costs, so that rounding in sums of negated weights does
/// not look like an improvement.
const EPSILON: f64 = 1e-9;

/// Which half of an original node a split node stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Half {
    /// The source or the target, which are never split.
    Whole,
    In,
    Out,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct SplitNode {
    pub(crate) original: NodeId,
    pub(crate) half: Half,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct SplitEdge {
    pub(crate) from: usize,
    pub(crate) to: usize,
    pub(crate) weight: f64,
    /// Whether this is the in -> out edge of a split node.
    pub(crate) internal: bool,
}

pub(crate) struct SplitGraph {
    nodes: Vec<SplitNode>,
    edges: Vec<SplitEdge>,
    source: usize,
    target: usize,
}

impl SplitGraph {
    /// Split every node of `graph` except `source` and `target`.
    ///
    /// Edges entering `source` or leaving `target` are left out, since no shortest path would use them.
    ///
    /// # Precondition
    ///
    /// Both `source` and `target` are nodes of `graph`, and they differ.
    pub(crate) fn new(graph: &Graph, source: NodeId, target: NodeId) -> Self {
        let mut nodes = Vec::with_capacity(graph.node_count() * 2);
        let mut edges = Vec::with_capacity(graph.edge_count() + graph.node_count());
        let mut in_index = HashMap::with_capacity(graph.node_count());
        let mut out_index = HashMap::with_capacity(graph.node_count());

        for id in graph.node_ids() {
            if id == source || id == target {
                let index = nodes.len();
                nodes.push(SplitNode {
                    original: id,
                    half: Half::Whole,
                });
                in_index.insert(id, index);
                out_index.insert(id, index);
            } else {
                let in_half = nodes.len();
                nodes.push(SplitNode {
                    original: id,
                    half: Half::In,
                });
                let out_half = nodes.len();
                nodes.push(SplitNode {
                    original: id,
                    half: Half::Out,
                });
                edges.push(SplitEdge {
                    from: in_half,
                    to: out_half,
                    weight: 0.0,
                    internal: true,
                });
                in_index.insert(id, in_half);
                out_index.insert(id, out_half);
            }
        }

        for edge in graph.edges() {
            if edge.to == source || edge.from == target || edge.from == edge.to {
                continue;
            }
            edges.push(SplitEdge {
                from: out_index[&edge.from],
                to: in_index[&edge.to],
                weight: edge.weight,
                internal: false,
            });
        }

        Self {
            source: in_index[&source],
            target: in_index[&target],
            nodes,
            edges,
        }
    }

    pub(crate) fn original(&self, index: usize) -> NodeId {
        self.nodes[index].original
    }

    #[cfg(test)]
    pub(crate) fn node(&self, index: usize) -> &SplitNode {
        &self.nodes[index]
    }

    pub(crate) fn edge(&self, index: usize) -> &SplitEdge {
        &self.edges[index]
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    pub(crate) fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Find a cheapest path from the source to the target with Bellman-Ford relaxation, and return the
    /// indices of the edges on it, in order. Returns `Ok(None)` if the target is unreachable.
    ///
    /// Relaxation runs for at most `|V| - 1` rounds, stopping early once a round changes nothing. One
    /// more pass then asserts that the residual graph has no negative cycle. Augmentation on a node-split
    /// graph cannot create one, so hitting [`RoutingError::NegativeCycle`] means that invariant was
    /// broken.
    pub(crate) fn shortest_path(&self) -> Result<Option<Vec<usize>>, RoutingError> {
        let node_count = self.nodes.len();
        let mut distance = vec![f64::INFINITY; node_count];
        let mut predecessor: Vec<Option<usize>> = vec![None; node_count];
        distance[self.source] = 0.0;

        let mut converged = false;
        for _ in 0..node_count.saturating_sub(1) {
            if !self.relax(&mut distance, &mut predecessor) {
                converged = true;
                break;
            }
        }
        if !converged && self.relax(&mut distance, &mut predecessor) {
            return Err(RoutingError::NegativeCycle);
        }

        if distance[self.target].is_infinite() {
            return Ok(None);
        }

        // Walk the predecessor links back from the target. A well-formed predecessor chain is acyclic,
        // so it visits at most every node once.
        let mut path = Vec::new();
        let mut current = self.target;
        while current != self.source {
            let edge_index = predecessor[current].ok_or(RoutingError::NegativeCycle)?;
            path.push(edge_index);
            if path.len() > node_count {
                return Err(RoutingError::NegativeCycle);
            }
            current = self.edges[edge_index].from;
        }
        path.reverse();
        Ok(Some(path))
    }

    /// One relaxation round over every edge. Returns whether any distance improved.
    fn relax(&self, distance: &mut [f64], predecessor: &mut [Option<usize>]) -> bool {
        let mut changed = false;
        for (index, edge) in self.edges.iter().enumerate() {
            let from_distance = distance[edge.from];
            if from_distance.is_infinite() {
                continue;
            }
            let candidate = from_distance + edge.weight;
            if improves(candidate, distance[edge.to]) {
                distance[edge.to] = candidate;
                predecessor[edge.to] = Some(index);
                changed = true;
            }
        }
        changed
    }

    /// Reverse every edge in `edge_indices` in place and negate its weight, so that a later augmenting
    /// path can cancel flow along it.
    pub(crate) fn reverse_edges(&mut self, edge_indices: &[usize]) {
        for &index in edge_indices {
            let edge = &mut self.edges[index];
            std::mem::swap(&mut edge.from, &mut edge.to);
            edge.weight = -edge.weight;
        }
    }

    #[cfg(test)]
    pub(crate) fn add_edge(&mut self, from: usize, to: usize, weight: f64) {
        self.edges.push(SplitEdge {
            from,
            to,
            weight,
            internal: false,
        });
    }
}

fn improves(candidate: f64, current: f64) -> bool {
    if current.is_infinite() {
        return candidate.is_finite();
    }
    candidate < current - EPSILON * (1.0 + current.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(int: u64) -> NodeId {
        NodeId::new(int)
    }

    fn line() -> Graph {
        let mut graph = Graph::new();
        graph.add_undirected_edge(n(0), n(1), 1.0);
        graph.add_undirected_edge(n(1), n(2), 1.0);
        graph
    }

    #[test]
    fn only_inner_nodes_are_split() {
        let split = SplitGraph::new(&line(), n(0), n(2));
        // 0 and 2 stay whole, 1 becomes two halves.
        assert_eq!(split.node_count(), 4);
        assert_eq!(split.node(0).half, Half::Whole);
        assert_eq!(split.node(1).half, Half::In);
        assert_eq!(split.node(2).half, Half::Out);
        assert_eq!(split.original(1), n(1));
        assert_eq!(split.original(2), n(1));
        // One internal edge plus 0->1 and 1->2; 1->0 enters the source and 2->1 leaves the target.
        assert_eq!(split.edge_count(), 3);
    }

    #[test]
    fn shortest_path_crosses_the_internal_edge() {
        let split = SplitGraph::new(&line(), n(0), n(2));
        let path = split.shortest_path().unwrap().unwrap();
        assert_eq!(path.len(), 3);
        assert!(split.edge(path[1]).internal);
        assert_eq!(split.original(split.edge(path[0]).from), n(0));
        assert_eq!(split.original(split.edge(path[2]).to), n(2));
    }

    #[test]
    fn reversing_a_path_disconnects_a_line() {
        let mut split = SplitGraph::new(&line(), n(0), n(2));
        let path = split.shortest_path().unwrap().unwrap();
        split.reverse_edges(&path);
        assert_eq!(split.shortest_path().unwrap(), None);
    }

    #[test]
    fn negative_cycle_is_reported() {
        let mut graph = Graph::new();
        graph.add_edge(n(0), n(1), 1.0);
        graph.add_edge(n(1), n(2), 1.0);
        graph.add_edge(n(2), n(3), 1.0);
        graph.add_edge(n(3), n(4), 1.0);
        let mut split = SplitGraph::new(&graph, n(0), n(4));
        // Out half of 2 back to the in half of 1, making 1 -> 2 -> 1 cost -1 in total.
        split.add_edge(4, 1, -3.0);
        assert_eq!(split.shortest_path(), Err(RoutingError::NegativeCycle));
    }
}
