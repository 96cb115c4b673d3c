/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Computes `k` mutually vertex-disjoint paths between two nodes.
//!
//! ## Algorithm
//!
//! [`disjoint_paths`] is a successive-shortest-augmenting-path algorithm in the style of Suurballe and
//! Bhandari:
//! 1. Split the graph ([`SplitGraph`]) so that every node other than the endpoints can be crossed at
//!    most once.
//! 2. Repeat `k` times: find a cheapest path from `s` to `t` with Bellman-Ford (the residual graph has
//!    negative weights after the first round), record its edges mapped back to original node ids
//!    (skipping the internal in -> out edges), then reverse every edge of the path in place with its
//!    weight negated.
//! 3. Cancel counterparts: whenever two recorded edges connect the same endpoints in opposite
//!    directions, a later path has undone part of an earlier one. Both edges are dropped.
//! 4. Reassemble `k` paths from the surviving edges by following successor links from every edge that
//!    leaves `s` until `t` is reached.
//!
//! Recorded edges are kept in insertion order throughout, so steps 3 and 4 are deterministic.

use crate::graph::{Graph, Path, WeightedEdge};
use crate::types::NodeId;

use super::split_graph::SplitGraph;
use super::RoutingError;

/// Compute `k` vertex-disjoint paths from `source` to `target` in `graph`.
///
/// # Errors
///
/// - [`RoutingError::NodeNotFound`] if either endpoint is not in `graph`.
/// - [`RoutingError::InvalidEndpoints`] if `source == target`.
/// - [`RoutingError::NegativeWeight`] if `graph` has an edge with negative weight.
/// - [`RoutingError::NoPath`] if the local connectivity between `source` and `target` is below `k`.
pub fn disjoint_paths(
    graph: &Graph,
    source: NodeId,
    target: NodeId,
    k: usize,
) -> Result<Vec<Path>, RoutingError> {
    for endpoint in [source, target] {
        if !graph.contains_node(endpoint) {
            return Err(RoutingError::NodeNotFound(endpoint));
        }
    }
    if source == target {
        return Err(RoutingError::InvalidEndpoints(source));
    }
    if let Some(edge) = graph.edges().find(|edge| !(edge.weight >= 0.0)) {
        return Err(RoutingError::NegativeWeight {
            from: edge.from,
            to: edge.to,
            weight: edge.weight,
        });
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut split = SplitGraph::new(graph, source, target);
    let mut recorded: Vec<WeightedEdge> = Vec::new();

    for found in 0..k {
        let edge_indices = match split.shortest_path()? {
            Some(edge_indices) => edge_indices,
            None => {
                return Err(RoutingError::NoPath {
                    from: source,
                    to: target,
                    found,
                    requested: k,
                })
            }
        };

        for &index in &edge_indices {
            let edge = split.edge(index);
            if edge.internal {
                continue;
            }
            let from = split.original(edge.from);
            let to = split.original(edge.to);
            // A reversed internal edge maps onto a single original node.
            if from != to {
                recorded.push(WeightedEdge::new(from, to, edge.weight));
            }
        }

        split.reverse_edges(&edge_indices);
    }

    let surviving = cancel_counterparts(recorded);
    let paths = build_paths(graph, &surviving, source, target)?;
    if paths.len() != k {
        return Err(RoutingError::BrokenFlow { at: source });
    }
    Ok(paths)
}

/// The largest `k` for which [`disjoint_paths`] succeeds, i.e. the local vertex connectivity between
/// `source` and `target`.
pub fn local_connectivity(
    graph: &Graph,
    source: NodeId,
    target: NodeId,
) -> Result<usize, RoutingError> {
    let bound = graph
        .degree(source)
        .min(graph.edges().filter(|edge| edge.to == target).count());
    for k in 1..=bound {
        match disjoint_paths(graph, source, target, k) {
            Ok(_) => continue,
            Err(RoutingError::NoPath { found, .. }) => return Ok(found),
            Err(error) => return Err(error),
        }
    }
    Ok(bound)
}

/// Drop every pair of edges that are exact reverses of each other. Each edge cancels at most one
/// counterpart, which is the earliest one still standing.
fn cancel_counterparts(edges: Vec<WeightedEdge>) -> Vec<WeightedEdge> {
    let mut dropped = vec![false; edges.len()];
    for i in 0..edges.len() {
        if dropped[i] {
            continue;
        }
        let counterpart =
            (i + 1..edges.len()).find(|&j| !dropped[j] && edges[i].is_reverse_of(&edges[j]));
        if let Some(j) = counterpart {
            dropped[i] = true;
            dropped[j] = true;
        }
    }
    edges
        .into_iter()
        .zip(dropped)
        .filter_map(|(edge, dropped)| (!dropped).then_some(edge))
        .collect()
}

/// Follow successor links from every surviving edge leaving `source` until `target` is reached.
///
/// Weights are taken from `graph`, since recorded edges may carry negated residual weights.
fn build_paths(
    graph: &Graph,
    edges: &[WeightedEdge],
    source: NodeId,
    target: NodeId,
) -> Result<Vec<Path>, RoutingError> {
    let mut used = vec![false; edges.len()];
    let mut paths = Vec::new();

    for start in 0..edges.len() {
        if used[start] || edges[start].from != source {
            continue;
        }
        used[start] = true;
        let mut walk = vec![edges[start]];
        let mut current = edges[start].to;

        while current != target {
            let next = (0..edges.len())
                .find(|&index| !used[index] && edges[index].from == current)
                .ok_or(RoutingError::BrokenFlow { at: current })?;
            used[next] = true;
            walk.push(edges[next]);
            current = edges[next].to;
        }

        let walk = walk
            .into_iter()
            .map(|edge| {
                graph
                    .edge(edge.from, edge.to)
                    .copied()
                    .ok_or(RoutingError::BrokenFlow { at: edge.from })
            })
            .collect::<Result<Vec<_>, _>>()?;
        paths.push(Path::new(walk)?);
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::verify_disjoint;

    fn n(int: u64) -> NodeId {
        NodeId::new(int)
    }

    const A: u64 = 0;
    const B: u64 = 1;
    const C: u64 = 2;
    const D: u64 = 3;

    fn square() -> Graph {
        let mut graph = Graph::new();
        graph.add_undirected_edge(n(A), n(B), 0.0);
        graph.add_undirected_edge(n(A), n(C), 1.0);
        graph.add_undirected_edge(n(B), n(D), 1.0);
        graph.add_undirected_edge(n(C), n(D), 0.0);
        graph
    }

    fn node_lists(paths: &[Path]) -> Vec<Vec<NodeId>> {
        let mut lists: Vec<Vec<NodeId>> = paths.iter().map(Path::nodes).collect();
        lists.sort();
        lists
    }

    #[test]
    fn two_paths_in_a_square() {
        let graph = square();
        let paths = disjoint_paths(&graph, n(A), n(D), 2).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|path| path.is_valid(&graph)));
        assert!(verify_disjoint(&paths));
        assert_eq!(
            node_lists(&paths),
            vec![vec![n(A), n(B), n(D)], vec![n(A), n(C), n(D)]]
        );
    }

    #[test]
    fn trap_edge_is_undone_by_the_second_path() {
        let mut graph = square();
        graph.add_undirected_edge(n(B), n(C), 0.0);

        // The cheapest single path is a -> b -> c -> d, which blocks both disjoint routes.
        let single = disjoint_paths(&graph, n(A), n(D), 1).unwrap();
        assert_eq!(single[0].nodes(), vec![n(A), n(B), n(C), n(D)]);

        let paths = disjoint_paths(&graph, n(A), n(D), 2).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|path| path.is_valid(&graph)));
        assert!(verify_disjoint(&paths));
        assert_eq!(
            node_lists(&paths),
            vec![vec![n(A), n(B), n(D)], vec![n(A), n(C), n(D)]]
        );
    }

    #[test]
    fn single_route_cannot_yield_two_paths() {
        let mut graph = Graph::new();
        graph.add_undirected_edge(n(A), n(B), 1.0);
        graph.add_undirected_edge(n(B), n(D), 1.0);

        assert_eq!(
            disjoint_paths(&graph, n(A), n(D), 2),
            Err(RoutingError::NoPath {
                from: n(A),
                to: n(D),
                found: 1,
                requested: 2
            })
        );
        assert_eq!(local_connectivity(&graph, n(A), n(D)), Ok(1));
    }

    #[test]
    fn direct_edge_is_one_of_the_paths() {
        let mut graph = square();
        graph.add_undirected_edge(n(A), n(D), 5.0);
        let paths = disjoint_paths(&graph, n(A), n(D), 3).unwrap();
        assert!(verify_disjoint(&paths));
        assert!(paths.iter().any(|path| path.len() == 1));
        assert_eq!(local_connectivity(&graph, n(A), n(D)), Ok(3));
    }

    #[test]
    fn invalid_arguments() {
        let graph = square();
        assert_eq!(
            disjoint_paths(&graph, n(A), n(A), 1),
            Err(RoutingError::InvalidEndpoints(n(A)))
        );
        assert_eq!(
            disjoint_paths(&graph, n(A), n(9), 1),
            Err(RoutingError::NodeNotFound(n(9)))
        );
        assert_eq!(disjoint_paths(&graph, n(A), n(D), 0), Ok(Vec::new()));

        let mut negative = square();
        negative.add_edge(n(B), n(C), -1.0);
        assert!(matches!(
            disjoint_paths(&negative, n(A), n(D), 1),
            Err(RoutingError::NegativeWeight { .. })
        ));
    }

    #[test]
    fn counterparts_cancel_pairwise() {
        let edges = vec![
            WeightedEdge::new(n(0), n(1), 1.0),
            WeightedEdge::new(n(1), n(2), 1.0),
            WeightedEdge::new(n(2), n(1), -1.0),
            WeightedEdge::new(n(1), n(3), 1.0),
        ];
        let surviving = cancel_counterparts(edges);
        assert_eq!(
            surviving,
            vec![
                WeightedEdge::new(n(0), n(1), 1.0),
                WeightedEdge::new(n(1), n(3), 1.0),
            ]
        );
    }
}
