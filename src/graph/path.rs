/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Walks over a [`Graph`] and the structural vertex-disjointness check.

use std::collections::HashSet;

use crate::types::NodeId;

use super::{Graph, GraphError, WeightedEdge};

/// An ordered sequence of weighted edges forming a walk from a start node to an end node.
///
/// # Invariant
///
/// Consecutive edges share an endpoint: `edges[i].to == edges[i + 1].from`. The invariant is checked
/// by every constructor, so a `Path` can never be disconnected.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    edges: Vec<WeightedEdge>,
}

impl Path {
    /// Create a path out of `edges`.
    pub fn new(edges: Vec<WeightedEdge>) -> Result<Self, GraphError> {
        for (index, pair) in edges.windows(2).enumerate() {
            if pair[0].to != pair[1].from {
                return Err(GraphError::DisconnectedPath { index: index + 1 });
            }
        }
        Ok(Self { edges })
    }

    /// Create the path visiting `nodes` in order, taking edge weights from `graph`.
    pub fn from_nodes(graph: &Graph, nodes: &[NodeId]) -> Result<Self, GraphError> {
        let edges = nodes
            .windows(2)
            .map(|pair| {
                graph
                    .edge(pair[0], pair[1])
                    .copied()
                    .ok_or(GraphError::EdgeNotFound {
                        from: pair[0],
                        to: pair[1],
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { edges })
    }

    pub fn edges(&self) -> &[WeightedEdge] {
        &self.edges
    }

    /// Number of edges (hops).
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn start(&self) -> Option<NodeId> {
        self.edges.first().map(|edge| edge.from)
    }

    pub fn end(&self) -> Option<NodeId> {
        self.edges.last().map(|edge| edge.to)
    }

    /// The node right after the start.
    pub fn first_hop(&self) -> Option<NodeId> {
        self.edges.first().map(|edge| edge.to)
    }

    /// Every node on the walk, start and end included.
    pub fn nodes(&self) -> Vec<NodeId> {
        match self.edges.first() {
            None => Vec::new(),
            Some(first) => std::iter::once(first.from)
                .chain(self.edges.iter().map(|edge| edge.to))
                .collect(),
        }
    }

    /// The nodes strictly between start and end.
    pub fn intermediates(&self) -> Vec<NodeId> {
        let mut nodes = self.nodes();
        if nodes.len() <= 2 {
            return Vec::new();
        }
        nodes.pop();
        nodes.remove(0);
        nodes
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.edges.iter().any(|edge| edge.from == id || edge.to == id)
    }

    /// Sum of the edge weights.
    pub fn weight(&self) -> f64 {
        self.edges.iter().map(|edge| edge.weight).sum()
    }

    /// Whether every edge of this path exists in `graph`.
    pub fn is_valid(&self, graph: &Graph) -> bool {
        self.edges
            .iter()
            .all(|edge| graph.has_edge(edge.from, edge.to))
    }

    /// Whether no node is visited twice.
    pub fn is_simple(&self) -> bool {
        let nodes = self.nodes();
        let unique: HashSet<&NodeId> = nodes.iter().collect();
        unique.len() == nodes.len()
    }

    /// Whether this path is a strict prefix of `other`, comparing endpoints only.
    pub fn is_strict_prefix_of(&self, other: &Path) -> bool {
        self.len() < other.len()
            && self
                .edges
                .iter()
                .zip(other.edges.iter())
                .all(|(mine, theirs)| mine.same_endpoints(theirs))
    }

    /// Whether both paths visit the same nodes in the same order.
    pub fn same_route(&self, other: &Path) -> bool {
        self.len() == other.len()
            && self
                .edges
                .iter()
                .zip(other.edges.iter())
                .all(|(mine, theirs)| mine.same_endpoints(theirs))
    }
}

/// Check that `paths` are mutually vertex-disjoint.
///
/// Start and end nodes may be shared; every other node may appear at most once across all of the paths.
/// A path that visits one of its own nodes twice also fails the check.
pub fn verify_disjoint(paths: &[Path]) -> bool {
    let mut seen = HashSet::new();
    for path in paths {
        if !path.is_simple() {
            return false;
        }
        for node in path.intermediates() {
            if !seen.insert(node) {
                return false;
            }
        }
    }

    // An intermediate node of one path must not be the start or end of another.
    paths.iter().all(|path| {
        path.start().map_or(true, |start| !seen.contains(&start))
            && path.end().map_or(true, |end| !seen.contains(&end))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(int: u64) -> NodeId {
        NodeId::new(int)
    }

    fn diamond() -> Graph {
        let mut graph = Graph::new();
        graph.add_undirected_edge(n(0), n(1), 1.0);
        graph.add_undirected_edge(n(0), n(2), 1.0);
        graph.add_undirected_edge(n(1), n(3), 1.0);
        graph.add_undirected_edge(n(2), n(3), 1.0);
        graph
    }

    #[test]
    fn disconnected_edges_are_rejected() {
        let edges = vec![
            WeightedEdge::new(n(0), n(1), 1.0),
            WeightedEdge::new(n(2), n(3), 1.0),
        ];
        assert_eq!(
            Path::new(edges),
            Err(GraphError::DisconnectedPath { index: 1 })
        );
    }

    #[test]
    fn path_accessors() {
        let graph = diamond();
        let path = Path::from_nodes(&graph, &[n(0), n(1), n(3)]).unwrap();
        assert_eq!(path.start(), Some(n(0)));
        assert_eq!(path.end(), Some(n(3)));
        assert_eq!(path.first_hop(), Some(n(1)));
        assert_eq!(path.nodes(), vec![n(0), n(1), n(3)]);
        assert_eq!(path.intermediates(), vec![n(1)]);
        assert_eq!(path.weight(), 2.0);
        assert!(path.is_valid(&graph));

        assert_eq!(
            Path::from_nodes(&graph, &[n(0), n(3)]),
            Err(GraphError::EdgeNotFound { from: n(0), to: n(3) })
        );
    }

    #[test]
    fn prefixes() {
        let graph = diamond();
        let short = Path::from_nodes(&graph, &[n(0), n(1)]).unwrap();
        let long = Path::from_nodes(&graph, &[n(0), n(1), n(3)]).unwrap();
        assert!(short.is_strict_prefix_of(&long));
        assert!(!long.is_strict_prefix_of(&short));
        assert!(!long.is_strict_prefix_of(&long));
    }

    #[test]
    fn disjointness() {
        let graph = diamond();
        let upper = Path::from_nodes(&graph, &[n(0), n(1), n(3)]).unwrap();
        let lower = Path::from_nodes(&graph, &[n(0), n(2), n(3)]).unwrap();
        assert!(verify_disjoint(&[upper.clone(), lower]));

        let detour = Path::from_nodes(&graph, &[n(0), n(2), n(3), n(1)]).unwrap();
        assert!(!verify_disjoint(&[upper, detour]));
    }
}
