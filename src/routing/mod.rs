/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Vertex-disjoint path routing and broadcast plans.
//!
//! The path-based protocols ([`crate::dolev`] and [`crate::bracha_dolev`]) need, for every origin, a set
//! of mutually vertex-disjoint routes to every other node. This module computes them in three layers:
//! 1. [`disjoint_paths`]: `k` vertex-disjoint paths between two nodes.
//! 2. [`build_lookup_table`]: one [`RoutingTable`] per source, covering every destination.
//! 3. [`build_broadcast_plan`]: the routes of a table grouped by first hop, optionally with redundant
//!    sub-routes filtered out ([`filter_subpaths`]), plus [`resolve_forwarding_priority`] to break
//!    circular forwarding dependencies between origins.
//!
//! Everything in this module is a pure, synchronous computation that runs once, when a protocol
//! instance is initialized.

use std::fmt::{self, Display, Formatter};

use crate::graph::GraphError;
use crate::types::NodeId;

pub mod broadcast_plan;

pub mod disjoint_paths;

pub mod lookup_table;

pub(crate) mod split_graph;

pub use broadcast_plan::{
    build_broadcast_plan, build_partial_broadcast_plan, filter_subpaths,
    resolve_forwarding_priority, BroadcastPlan, PlanEntry,
};
pub use disjoint_paths::{disjoint_paths, local_connectivity};
pub use lookup_table::{build_all_lookup_tables, build_lookup_table, Route, RoutingTable};

/// The different ways routing can fail. Every variant is fatal to the run that requested the routes.
#[derive(Clone, Debug, PartialEq)]
pub enum RoutingError {
    NodeNotFound(NodeId),

    /// A route was requested from a node to itself.
    InvalidEndpoints(NodeId),

    /// The input graph has an edge with a negative weight.
    NegativeWeight { from: NodeId, to: NodeId, weight: f64 },

    /// The local connectivity between `from` and `to` is `found`, below the `requested` number of
    /// disjoint paths.
    NoPath {
        from: NodeId,
        to: NodeId,
        found: usize,
        requested: usize,
    },

    /// The residual graph has a negative cycle, which node splitting is supposed to rule out.
    NegativeCycle,

    /// The augmented edge set does not decompose into paths. Seen at node `at`.
    BrokenFlow { at: NodeId },

    /// A route conflicts with itself: it crosses some edge in both directions.
    SelfConflict { origin: NodeId },

    Graph(GraphError),
}

impl Display for RoutingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::NodeNotFound(id) => write!(f, "node {} not found", id),
            RoutingError::InvalidEndpoints(id) => write!(f, "cannot route from {} to itself", id),
            RoutingError::NegativeWeight { from, to, weight } => {
                write!(f, "edge {} -> {} has negative weight {}", from, to, weight)
            }
            RoutingError::NoPath {
                from,
                to,
                found,
                requested,
            } => write!(
                f,
                "no path: only {} of {} disjoint paths exist from {} to {}",
                found, requested, from, to
            ),
            RoutingError::NegativeCycle => write!(f, "residual graph has a negative cycle"),
            RoutingError::BrokenFlow { at } => {
                write!(f, "augmented edges do not form paths at node {}", at)
            }
            RoutingError::SelfConflict { origin } => {
                write!(f, "a route of origin {} conflicts with itself", origin)
            }
            RoutingError::Graph(error) => Display::fmt(error, f),
        }
    }
}

impl std::error::Error for RoutingError {}

impl From<GraphError> for RoutingError {
    fn from(value: GraphError) -> Self {
        RoutingError::Graph(value)
    }
}
