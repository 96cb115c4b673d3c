/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Interface to the (external) topology generators.

use std::sync::Arc;

use super::Graph;

/// A weighted undirected graph together with the system parameters it was generated for.
#[derive(Clone, Debug)]
pub struct Topology {
    pub graph: Arc<Graph>,
    /// Total number of nodes, N.
    pub node_count: usize,
    /// Upper bound on the number of Byzantine nodes, F.
    pub fault_bound: usize,
}

impl Topology {
    pub fn new(graph: Graph, fault_bound: usize) -> Self {
        let node_count = graph.node_count();
        Self {
            graph: Arc::new(graph),
            node_count,
            fault_bound,
        }
    }
}

/// Produces the topology of a run. Implemented by graph generators and graph caches, neither of which is
/// part of this crate.
pub trait TopologyProvider {
    fn topology(&self) -> Topology;
}

impl TopologyProvider for Topology {
    fn topology(&self) -> Topology {
        self.clone()
    }
}
