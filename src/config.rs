/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-node protocol configuration.
//!
//! A [`Config`] is built once per node by the harness, using the builder pattern:
//!
//! ```
//! use std::collections::BTreeSet;
//! use brb_rs::config::{BrachaConfig, Config};
//! use brb_rs::types::NodeId;
//!
//! let config = Config::builder()
//!     .id(NodeId::new(0))
//!     .neighbors(BTreeSet::from([NodeId::new(1), NodeId::new(2), NodeId::new(3)]))
//!     .node_count(4)
//!     .fault_bound(1)
//!     .bracha(BrachaConfig::builder().improved(true).build())
//!     .log_events(true)
//!     .build();
//! assert_eq!(config.resilience(), 3);
//! ```
//!
//! The configuration is immutable once a protocol has been initialized with it.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use typed_builder::TypedBuilder;

use crate::bracha::types::Thresholds;
use crate::event_bus::EventHandlers;
use crate::graph::{Graph, Topology};
use crate::protocol::ProtocolKind;
use crate::types::NodeId;

/// Parameters of the path-based protocols' routing.
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
pub struct RoutingConfig {
    #[builder(default, setter(strip_option, doc = "Set the number of disjoint routes computed towards every destination. Optional, defaults to 2F+1."))]
    pub resilience: Option<usize>,
    #[builder(default = 0.0, setter(doc = "Set the weight added to edges already used by earlier destinations' routes. Optional, defaults to 0."))]
    pub bias_weight: f64,
    #[builder(default = true, setter(doc = "Send one message per next hop instead of one per route. Optional, defaults to true."))]
    pub combine_next_hops: bool,
    #[builder(default = true, setter(doc = "Drop routes that are prefixes of other routes. Optional, defaults to true."))]
    pub filter_subpaths: bool,
    #[builder(default = true, setter(doc = "Merge relays bound for the same next hop into one message. Optional, defaults to true."))]
    pub merge_relays: bool,
    #[builder(default = true, setter(doc = "Once delivered, forward with a trace that restarts at this node. Optional, defaults to true."))]
    pub delivered_shortcut: bool,
    #[builder(default = true, setter(doc = "Give forwarding priority to one of every pair of routes that cross an edge in opposite directions. Optional, defaults to true."))]
    pub resolve_priorities: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Parameters of the quorum-based protocols.
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder)]
pub struct BrachaConfig {
    #[builder(default = false, setter(doc = "Only let the included nodes exchange echoes. Optional, defaults to false."))]
    pub improved: bool,
    #[builder(default, setter(strip_option, doc = "Set the nodes that exchange echoes. Optional, defaults to the lowest echo-quorum + F node ids."))]
    pub included: Option<Vec<NodeId>>,
    #[builder(default = false, setter(doc = "In the hybrid protocol, only route echoes towards the included nodes. Optional, defaults to false."))]
    pub partial_relay: bool,
}

/// Everything a protocol instance needs to run on one node.
#[derive(Clone, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Config]. On the builder call the following methods to construct a valid [Config].

    Required:
    - `.id(...)`
    - `.neighbors(...)`
    - `.node_count(...)`
    - `.fault_bound(...)`
"))]
pub struct Config {
    #[builder(setter(doc = "Set the id of this node. Required."))]
    pub id: NodeId,
    #[builder(setter(doc = "Set the nodes this node has a link to. Must not contain the node itself. Required."))]
    pub neighbors: BTreeSet<NodeId>,
    #[builder(setter(doc = "Set the total number of nodes, N. Required."))]
    pub node_count: usize,
    #[builder(setter(doc = "Set the upper bound on the number of Byzantine nodes, F. Required."))]
    pub fault_bound: usize,
    #[builder(default = false, setter(doc = "Make this node Byzantine for the run. Optional, defaults to false."))]
    pub byzantine: bool,
    #[builder(default, setter(strip_option, doc = "Set the topology the routed protocols compute their routes on. Optional."))]
    pub topology: Option<Arc<Graph>>,
    #[builder(default, setter(doc = "Set the routing parameters. Optional."))]
    pub routing: RoutingConfig,
    #[builder(default, setter(doc = "Set the Bracha parameters. Optional."))]
    pub bracha: BrachaConfig,
    #[builder(default = false, setter(doc = "Print events as log lines. Optional, defaults to false."))]
    pub log_events: bool,
    #[builder(default, setter(doc = "Set user-defined event handlers. Optional."))]
    pub event_handlers: Arc<EventHandlers>,
}

impl Config {
    /// Configuration of node `id` in `topology`, with every optional parameter at its default.
    pub fn for_node(topology: &Topology, id: NodeId) -> Config {
        Config::builder()
            .id(id)
            .neighbors(topology.graph.neighbors(id).collect())
            .node_count(topology.node_count)
            .fault_bound(topology.fault_bound)
            .topology(topology.graph.clone())
            .build()
    }

    /// Number of disjoint routes towards every destination.
    pub fn resilience(&self) -> usize {
        self.routing
            .resilience
            .unwrap_or(2 * self.fault_bound + 1)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.node_count, self.fault_bound)
    }

    /// Every node of the system: the nodes of the topology if there is one, otherwise this node and its
    /// neighbors, as in a fully connected network.
    pub fn all_nodes(&self) -> BTreeSet<NodeId> {
        match &self.topology {
            Some(graph) => graph.node_ids().collect(),
            None => self
                .neighbors
                .iter()
                .copied()
                .chain(std::iter::once(self.id))
                .collect(),
        }
    }

    /// The nodes that exchange echoes in the improved Bracha variant and that the hybrid's partial relay
    /// targets.
    pub fn included(&self) -> BTreeSet<NodeId> {
        match &self.bracha.included {
            Some(included) => included.iter().copied().collect(),
            None => {
                let size = self.thresholds().echo + self.fault_bound;
                self.all_nodes().into_iter().take(size).collect()
            }
        }
    }

    /// Check that this configuration can run a protocol of the given `kind`.
    pub fn validate(&self, kind: ProtocolKind) -> Result<(), ConfigError> {
        if self.neighbors.contains(&self.id) {
            return Err(ConfigError::SelfNeighbor(self.id));
        }

        let required_nodes = match kind {
            ProtocolKind::Bracha | ProtocolKind::BrachaDolev => 3 * self.fault_bound + 1,
            ProtocolKind::Dolev | ProtocolKind::DolevRouted => 2 * self.fault_bound + 1,
        };
        if self.node_count < required_nodes {
            return Err(ConfigError::TooManyFaults {
                node_count: self.node_count,
                fault_bound: self.fault_bound,
            });
        }

        if kind.is_routed() {
            let graph = self.topology.as_ref().ok_or(ConfigError::MissingTopology)?;
            if !graph.contains_node(self.id) {
                return Err(ConfigError::UnknownNode(self.id));
            }
            if self.resilience() < self.fault_bound + 1 {
                return Err(ConfigError::InsufficientResilience {
                    resilience: self.resilience(),
                    required: self.fault_bound + 1,
                });
            }
        }

        if let Some(included) = &self.bracha.included {
            let all_nodes = self.all_nodes();
            if let Some(unknown) = included.iter().find(|id| !all_nodes.contains(id)) {
                return Err(ConfigError::UnknownNode(*unknown));
            }
            let distinct = included.iter().collect::<BTreeSet<_>>().len();
            if distinct < self.thresholds().echo {
                return Err(ConfigError::IncludedTooSmall {
                    size: distinct,
                    required: self.thresholds().echo,
                });
            }
        }

        Ok(())
    }
}

/// The ways a [`Config`] can be unfit for a protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The node is listed among its own neighbors.
    SelfNeighbor(NodeId),

    /// The protocol cannot tolerate `fault_bound` faults among `node_count` nodes.
    TooManyFaults { node_count: usize, fault_bound: usize },

    /// A routed protocol was configured without a topology.
    MissingTopology,

    /// A node is not part of the topology.
    UnknownNode(NodeId),

    /// Fewer routes per destination than the F+1 disjoint paths delivery needs.
    InsufficientResilience { resilience: usize, required: usize },

    /// The included set cannot reach the echo quorum on its own.
    IncludedTooSmall { size: usize, required: usize },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::SelfNeighbor(id) => write!(f, "node {} is its own neighbor", id),
            ConfigError::TooManyFaults {
                node_count,
                fault_bound,
            } => write!(
                f,
                "{} nodes cannot tolerate {} Byzantine nodes",
                node_count, fault_bound
            ),
            ConfigError::MissingTopology => write!(f, "routed protocol needs a topology"),
            ConfigError::UnknownNode(id) => write!(f, "node {} is not part of the topology", id),
            ConfigError::InsufficientResilience {
                resilience,
                required,
            } => write!(
                f,
                "resilience {} is below the {} disjoint paths needed to deliver",
                resilience, required
            ),
            ConfigError::IncludedTooSmall { size, required } => write!(
                f,
                "included set of {} nodes is smaller than the echo quorum {}",
                size, required
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(int: u64) -> NodeId {
        NodeId::new(int)
    }

    fn complete(node_count: u64) -> Graph {
        let mut graph = Graph::new();
        for a in 0..node_count {
            for b in a + 1..node_count {
                graph.add_undirected_edge(n(a), n(b), 1.0);
            }
        }
        graph
    }

    #[test]
    fn defaults() {
        let config = Config::for_node(&Topology::new(complete(4), 1), n(2));
        assert_eq!(config.neighbors, BTreeSet::from([n(0), n(1), n(3)]));
        assert_eq!(config.resilience(), 3);
        assert!(config.routing.combine_next_hops);
        assert!(config.routing.delivered_shortcut);
        assert!(!config.bracha.improved);
        assert!(!config.byzantine);
        assert_eq!(config.all_nodes().len(), 4);
        for kind in [
            ProtocolKind::Bracha,
            ProtocolKind::Dolev,
            ProtocolKind::DolevRouted,
            ProtocolKind::BrachaDolev,
        ] {
            assert_eq!(config.validate(kind), Ok(()));
        }
    }

    #[test]
    fn included_defaults_to_lowest_ids() {
        let config = Config::for_node(&Topology::new(complete(10), 2), n(9));
        // Echo quorum of N = 10, F = 2 is 7.
        assert_eq!(config.included(), (0..9).map(n).collect::<BTreeSet<_>>());

        let explicit = Config {
            bracha: BrachaConfig::builder()
                .included(vec![n(3), n(4), n(5), n(6), n(7), n(8), n(9)])
                .build(),
            ..config
        };
        assert_eq!(explicit.included().len(), 7);
        assert_eq!(explicit.validate(ProtocolKind::Bracha), Ok(()));
    }

    #[test]
    fn invalid_configurations() {
        let base = Config::builder()
            .id(n(0))
            .neighbors(BTreeSet::from([n(1), n(2)]))
            .node_count(3)
            .fault_bound(1)
            .build();

        assert_eq!(
            base.validate(ProtocolKind::Bracha),
            Err(ConfigError::TooManyFaults {
                node_count: 3,
                fault_bound: 1
            })
        );
        assert_eq!(
            base.validate(ProtocolKind::DolevRouted),
            Err(ConfigError::MissingTopology)
        );
        assert_eq!(base.validate(ProtocolKind::Dolev), Ok(()));

        let self_neighbor = Config {
            neighbors: BTreeSet::from([n(0), n(1)]),
            ..base.clone()
        };
        assert_eq!(
            self_neighbor.validate(ProtocolKind::Dolev),
            Err(ConfigError::SelfNeighbor(n(0)))
        );

        let weak = Config {
            topology: Some(Arc::new(complete(3))),
            routing: RoutingConfig::builder().resilience(1).build(),
            ..base.clone()
        };
        assert_eq!(
            weak.validate(ProtocolKind::DolevRouted),
            Err(ConfigError::InsufficientResilience {
                resilience: 1,
                required: 2
            })
        );

        let small_included = Config {
            node_count: 4,
            neighbors: BTreeSet::from([n(1), n(2), n(3)]),
            bracha: BrachaConfig::builder().included(vec![n(0), n(1)]).build(),
            ..base
        };
        assert_eq!(
            small_included.validate(ProtocolKind::Bracha),
            Err(ConfigError::IncludedTooSmall {
                size: 2,
                required: 3
            })
        );
    }
}
