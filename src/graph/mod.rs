/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Weighted graph model shared by the router and the path-based protocols.
//!
//! A [`Graph`] is a set of [`Node`]s connected by directed [`WeightedEdge`]s. Undirected topologies,
//! which are what the topology generators produce, are modeled as symmetric pairs of directed edges
//! with equal weight (see [`Graph::add_undirected_edge`]).
//!
//! Edges leaving a node are kept in insertion order. Every algorithm in this crate iterates edges in
//! that order, which makes routing results reproducible across runs.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use crate::types::NodeId;

pub mod path;

pub mod topology;

pub use path::{verify_disjoint, Path};
pub use topology::{Topology, TopologyProvider};

/// A vertex of a [`Graph`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A directed edge `from -> to` with a real-valued weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
}

impl WeightedEdge {
    pub fn new(from: NodeId, to: NodeId, weight: f64) -> Self {
        Self { from, to, weight }
    }

    /// The same edge pointing the other way, with the same weight.
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            weight: self.weight,
        }
    }

    /// Whether `other` connects the same two endpoints in the opposite direction.
    pub fn is_reverse_of(&self, other: &WeightedEdge) -> bool {
        self.from == other.to && self.to == other.from
    }

    /// Whether `other` connects the same two endpoints in the same direction.
    pub fn same_endpoints(&self, other: &WeightedEdge) -> bool {
        self.from == other.from && self.to == other.to
    }
}

/// A directed, weighted graph.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    out_edges: BTreeMap<NodeId, Vec<WeightedEdge>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with the given display `name`. If a node with `id` already exists, only its name is
    /// updated.
    pub fn add_node(&mut self, id: NodeId, name: impl Into<String>) {
        let name = name.into();
        self.nodes
            .entry(id)
            .and_modify(|node| node.name = name.clone())
            .or_insert_with(|| Node::new(id, name));
        self.out_edges.entry(id).or_default();
    }

    /// Add a node named after its id, unless it already exists.
    pub fn ensure_node(&mut self, id: NodeId) {
        if !self.nodes.contains_key(&id) {
            self.add_node(id, id.to_string());
        }
    }

    /// Add the directed edge `from -> to`, creating both endpoints if needed. If the edge already
    /// exists its weight is overwritten.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, weight: f64) {
        self.ensure_node(from);
        self.ensure_node(to);
        let edges = self.out_edges.entry(from).or_default();
        match edges.iter_mut().find(|edge| edge.to == to) {
            Some(edge) => edge.weight = weight,
            None => edges.push(WeightedEdge::new(from, to, weight)),
        }
    }

    /// Add both `a -> b` and `b -> a` with the same `weight`.
    pub fn add_undirected_edge(&mut self, a: NodeId, b: NodeId, weight: f64) {
        self.add_edge(a, b, weight);
        self.add_edge(b, a, weight);
    }

    /// Remove the directed edge `from -> to`, returning it if it existed.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> Option<WeightedEdge> {
        let edges = self.out_edges.get_mut(&from)?;
        let index = edges.iter().position(|edge| edge.to == to)?;
        Some(edges.remove(index))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&WeightedEdge> {
        self.out_edges
            .get(&from)
            .and_then(|edges| edges.iter().find(|edge| edge.to == to))
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edge(from, to).is_some()
    }

    pub fn weight(&self, from: NodeId, to: NodeId) -> Option<f64> {
        self.edge(from, to).map(|edge| edge.weight)
    }

    /// Add `delta` to the weight of `from -> to`. Returns `false` if the edge does not exist.
    pub fn add_weight(&mut self, from: NodeId, to: NodeId, delta: f64) -> bool {
        match self
            .out_edges
            .get_mut(&from)
            .and_then(|edges| edges.iter_mut().find(|edge| edge.to == to))
        {
            Some(edge) => {
                edge.weight += delta;
                true
            }
            None => false,
        }
    }

    /// Edges leaving `id`, in insertion order.
    pub fn out_edges(&self, id: NodeId) -> &[WeightedEdge] {
        self.out_edges
            .get(&id)
            .map(|edges| edges.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes reachable from `id` over a single edge.
    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.out_edges(id).iter().map(|edge| edge.to)
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.out_edges(id).len()
    }

    /// Every edge of the graph, grouped by source node in ascending id order.
    pub fn edges(&self) -> impl Iterator<Item = &WeightedEdge> {
        self.out_edges.values().flatten()
    }

    pub fn edge_count(&self) -> usize {
        self.out_edges.values().map(Vec::len).sum()
    }

    /// Whether every edge has a reverse twin of equal weight.
    pub fn is_undirected(&self) -> bool {
        self.edges()
            .all(|edge| self.weight(edge.to, edge.from) == Some(edge.weight))
    }

    /// The lowest edge weight in the graph, if it has any edge.
    pub fn min_weight(&self) -> Option<f64> {
        self.edges().map(|edge| edge.weight).reduce(f64::min)
    }
}

/// The different ways a graph query or construction can fail.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphError {
    NodeNotFound(NodeId),
    EdgeNotFound { from: NodeId, to: NodeId },
    /// Edge number `index` of a path does not start where edge `index - 1` ended.
    DisconnectedPath { index: usize },
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::NodeNotFound(id) => write!(f, "node {} not found", id),
            GraphError::EdgeNotFound { from, to } => write!(f, "edge {} -> {} not found", from, to),
            GraphError::DisconnectedPath { index } => {
                write!(f, "path edge {} does not continue from the previous edge", index)
            }
        }
    }
}

impl std::error::Error for GraphError {}
