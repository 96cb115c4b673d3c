/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-source routing tables.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::graph::{verify_disjoint, Graph, Path};
use crate::types::NodeId;

use super::disjoint_paths::disjoint_paths;
use super::RoutingError;

/// One of the disjoint paths from a table's source to a destination.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub path: Path,
    /// Whether relays must forward this route ahead of non-priority traffic. Set by
    /// [`resolve_forwarding_priority`](super::resolve_forwarding_priority).
    pub priority: bool,
}

impl Route {
    pub fn new(path: Path) -> Self {
        Self {
            path,
            priority: false,
        }
    }
}

/// Maps every destination to an ordered list of mutually vertex-disjoint routes from a fixed source.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutingTable {
    source: NodeId,
    routes: BTreeMap<NodeId, Vec<Route>>,
}

impl RoutingTable {
    pub fn new(source: NodeId) -> Self {
        Self {
            source,
            routes: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Set the routes to `destination`, replacing any previous entry.
    pub fn insert(&mut self, destination: NodeId, paths: Vec<Path>) {
        self.routes
            .insert(destination, paths.into_iter().map(Route::new).collect());
    }

    pub fn routes(&self, destination: NodeId) -> Option<&[Route]> {
        self.routes.get(&destination).map(Vec::as_slice)
    }

    /// Destinations in ascending order.
    pub fn destinations(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.routes.keys().copied()
    }

    /// Every route in the table as `(destination, index, route)`, by ascending destination.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, usize, &Route)> {
        self.routes.iter().flat_map(|(destination, routes)| {
            routes
                .iter()
                .enumerate()
                .map(move |(index, route)| (*destination, index, route))
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn route_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Mark route number `index` to `destination` as a priority route. Returns `false` if there is no
    /// such route.
    pub fn mark_priority(&mut self, destination: NodeId, index: usize) -> bool {
        match self
            .routes
            .get_mut(&destination)
            .and_then(|routes| routes.get_mut(index))
        {
            Some(route) => {
                route.priority = true;
                true
            }
            None => false,
        }
    }

    pub fn priority_count(&self) -> usize {
        self.iter().filter(|(_, _, route)| route.priority).count()
    }

    /// Whether every entry holds mutually vertex-disjoint paths from the source to its destination.
    pub fn is_consistent(&self) -> bool {
        self.routes.iter().all(|(destination, routes)| {
            let paths: Vec<Path> = routes.iter().map(|route| route.path.clone()).collect();
            routes.iter().all(|route| {
                route.path.start() == Some(self.source) && route.path.end() == Some(*destination)
            }) && verify_disjoint(&paths)
        })
    }
}

/// Compute the routing table of `source`: `k` disjoint paths to every other node of `graph`.
///
/// Destinations are visited in ascending id order. If `bias_weight` is positive, it is added to the
/// weight of every edge used by the routes of earlier destinations, so that later destinations prefer
/// other edges. This spreads load across the topology; it changes costs, never correctness.
pub fn build_lookup_table(
    graph: &Graph,
    source: NodeId,
    k: usize,
    bias_weight: f64,
) -> Result<RoutingTable, RoutingError> {
    if !graph.contains_node(source) {
        return Err(RoutingError::NodeNotFound(source));
    }

    let mut working: Cow<Graph> = Cow::Borrowed(graph);
    let mut table = RoutingTable::new(source);

    for destination in graph.node_ids().filter(|id| *id != source) {
        let paths = disjoint_paths(&working, source, destination, k)?;

        if bias_weight > 0.0 {
            let biased = working.to_mut();
            for edge in paths.iter().flat_map(|path| path.edges()) {
                biased.add_weight(edge.from, edge.to, bias_weight);
            }
        }

        // Report weights of the unbiased graph.
        let paths = paths
            .iter()
            .map(|path| Path::from_nodes(graph, &path.nodes()))
            .collect::<Result<Vec<_>, _>>()?;
        table.insert(destination, paths);
    }

    Ok(table)
}

/// Compute the routing table of every node of `graph`, keyed by source.
pub fn build_all_lookup_tables(
    graph: &Graph,
    k: usize,
    bias_weight: f64,
) -> Result<BTreeMap<NodeId, RoutingTable>, RoutingError> {
    graph
        .node_ids()
        .map(|source| Ok((source, build_lookup_table(graph, source, k, bias_weight)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(int: u64) -> NodeId {
        NodeId::new(int)
    }

    /// Wheel with hub 0 and rim 1..=5.
    fn wheel() -> Graph {
        let mut graph = Graph::new();
        for rim in 1..=5 {
            graph.add_undirected_edge(n(0), n(rim), 1.0);
            graph.add_undirected_edge(n(rim), n(rim % 5 + 1), 1.0);
        }
        graph
    }

    #[test]
    fn table_covers_every_other_node() {
        let graph = wheel();
        let table = build_lookup_table(&graph, n(1), 3, 0.0).unwrap();
        assert_eq!(table.source(), n(1));
        assert_eq!(
            table.destinations().collect::<Vec<_>>(),
            vec![n(0), n(2), n(3), n(4), n(5)]
        );
        assert_eq!(table.route_count(), 15);
        assert!(table.is_consistent());
        assert!(table
            .iter()
            .all(|(_, _, route)| route.path.is_valid(&graph) && !route.priority));
    }

    #[test]
    fn bias_keeps_tables_consistent() {
        let graph = wheel();
        let table = build_lookup_table(&graph, n(2), 3, 10.0).unwrap();
        assert!(table.is_consistent());
        // Reported weights are those of the input graph.
        assert!(table
            .iter()
            .all(|(_, _, route)| route.path.weight() == route.path.len() as f64));
    }

    #[test]
    fn insufficient_connectivity_fails_the_table() {
        let graph = wheel();
        assert!(matches!(
            build_lookup_table(&graph, n(1), 4, 0.0),
            Err(RoutingError::NoPath { requested: 4, .. })
        ));
    }

    #[test]
    fn every_source_gets_a_table() {
        let graph = wheel();
        let tables = build_all_lookup_tables(&graph, 2, 0.0).unwrap();
        assert_eq!(tables.len(), 6);
        assert!(tables.values().all(RoutingTable::is_consistent));
    }

    #[test]
    fn priority_marks() {
        let graph = wheel();
        let mut table = build_lookup_table(&graph, n(1), 2, 0.0).unwrap();
        assert!(table.mark_priority(n(3), 1));
        assert!(!table.mark_priority(n(3), 2));
        assert!(!table.mark_priority(n(1), 0));
        assert_eq!(table.priority_count(), 1);
    }
}
