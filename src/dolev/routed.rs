/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Routed Dolev, independent of what the broadcast content means.
//!
//! [`RoutedDolevCore`] computes a node's routes, forwards messages along them, and reports deliveries
//! to its caller, which decides what a delivery means: [`DolevRouted`](super::DolevRouted) hands the
//! content to the application, while [`BrachaDolev`](crate::bracha_dolev::BrachaDolev) decodes it as
//! a Bracha vote.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::SystemTime;

use crate::config::{Config, ConfigError};
use crate::event_bus::EventPublisher;
use crate::events::*;
use crate::networking::sending::SenderHandle;
use crate::networking::{MessageType, Network};
use crate::protocol::ProtocolError;
use crate::routing::{
    build_all_lookup_tables, build_broadcast_plan, build_lookup_table,
    build_partial_broadcast_plan, resolve_forwarding_priority, BroadcastPlan, RoutingError,
    RoutingTable,
};
use crate::types::{MessageId, NodeId};

use super::collector::PathCollector;
use super::messages::{DolevPath, RoutedDolevMessage};
use super::outbox::Outbox;

/// A broadcast this node just delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Delivery {
    pub(crate) id: MessageId,
    pub(crate) content: Vec<u8>,
}

pub(crate) struct RoutedDolevCore {
    me: NodeId,
    fault_bound: usize,
    /// The type of the messages this core sends and accepts.
    message_type: MessageType,
    delivered_shortcut: bool,
    plan: BroadcastPlan,
    /// Plan towards a subset of the nodes, if one was requested.
    partial_plan: Option<BroadcastPlan>,
    collectors: HashMap<MessageId, PathCollector>,
    delivered: HashSet<MessageId>,
    outbox: Outbox,
    event_publisher: EventPublisher,
}

impl RoutedDolevCore {
    /// Compute this node's routes on the configured topology.
    ///
    /// If `partial_destinations` is given, a second plan that only reaches those nodes is computed as
    /// well, for [`broadcast`](Self::broadcast)s with `partial` set.
    pub(crate) fn new(
        config: &Config,
        message_type: MessageType,
        partial_destinations: Option<&BTreeSet<NodeId>>,
        event_publisher: EventPublisher,
    ) -> Result<Self, ProtocolError> {
        let table = compute_routing_table(config)?;
        let routing = &config.routing;
        let plan = build_broadcast_plan(&table, routing.combine_next_hops, routing.filter_subpaths);
        let partial_plan = partial_destinations.map(|destinations| {
            build_partial_broadcast_plan(
                &table,
                destinations,
                routing.combine_next_hops,
                routing.filter_subpaths,
            )
        });

        log::debug!(
            "node {} routes: {} messages per broadcast towards {:?}",
            config.id,
            plan.message_count(),
            plan.next_hops()
        );
        Event::ComputeRoutes(ComputeRoutesEvent {
            timestamp: SystemTime::now(),
            node: config.id,
            routes: table.route_count(),
            priority_routes: table.priority_count(),
            messages: plan.message_count(),
        })
        .publish(&event_publisher);

        Ok(Self {
            me: config.id,
            fault_bound: config.fault_bound,
            message_type,
            delivered_shortcut: routing.delivered_shortcut,
            plan,
            partial_plan,
            collectors: HashMap::new(),
            delivered: HashSet::new(),
            outbox: Outbox::new(routing.merge_relays),
            event_publisher,
        })
    }

    pub(crate) fn plan(&self) -> &BroadcastPlan {
        &self.plan
    }

    pub(crate) fn has_delivered(&self, id: &MessageId) -> bool {
        self.delivered.contains(id)
    }

    /// Queue a new broadcast instance along every route of the plan, or of the partial plan if `partial`
    /// is set and one was computed. The origin does not deliver through this core.
    pub(crate) fn broadcast(&mut self, id: MessageId, content: &[u8], partial: bool) {
        self.delivered.insert(id);
        let plan = match (&self.partial_plan, partial) {
            (Some(partial_plan), true) => partial_plan,
            _ => &self.plan,
        };

        for entry in plan.entries() {
            let paths: Vec<DolevPath> = entry
                .routes
                .iter()
                .map(|route| DolevPath {
                    desired: route.path.nodes(),
                    actual: vec![self.me],
                    priority: route.priority,
                })
                .collect();
            self.outbox.push_entry(entry.next_hop, id, content, paths);
        }
    }

    /// Process one routed message sent by neighbor `src`: record every route it traveled, forward it
    /// along each of them, and return the delivery if the message completed one.
    pub(crate) fn on_receive(
        &mut self,
        src: NodeId,
        message: RoutedDolevMessage,
    ) -> Result<Option<Delivery>, ProtocolError> {
        let RoutedDolevMessage { id, content, paths } = message;

        if !id.matches(&content) {
            log::warn!("routed message from {} does not match its id {}", src, id);
            self.ignore(src, IgnoreReason::Malformed);
            return Ok(None);
        }
        if id.origin == self.me {
            return Err(ProtocolError::InvariantViolation(format!(
                "node {} received its own broadcast {} back from {}",
                self.me, id, src
            )));
        }

        let already_delivered = self.delivered.contains(&id);
        let mut delivered_by: Option<DeliveryCause> = None;

        for path in paths {
            let position = match self.check_path(src, id.origin, &path)? {
                Some(position) => position,
                None => {
                    log::warn!(
                        "route {:?} of {} from {} does not lead through this node",
                        path.desired,
                        id,
                        src
                    );
                    self.ignore(src, IgnoreReason::Malformed);
                    continue;
                }
            };

            let DolevPath {
                desired,
                mut actual,
                priority,
            } = path;
            actual.push(self.me);

            if !already_delivered && delivered_by.is_none() {
                let intermediates: Vec<NodeId> = actual
                    .iter()
                    .copied()
                    .filter(|node| *node != id.origin && *node != self.me)
                    .collect();
                let collector = self.collectors.entry(id).or_default();
                collector.record(intermediates.iter().copied());
                let recorded = collector.len();
                if collector.has_disjoint(self.fault_bound + 1) {
                    delivered_by = Some(if intermediates.is_empty() {
                        DeliveryCause::Direct
                    } else {
                        DeliveryCause::DisjointPaths(self.fault_bound + 1)
                    });
                }
                Event::RecordPath(RecordPathEvent {
                    timestamp: SystemTime::now(),
                    node: self.me,
                    id,
                    intermediates,
                    recorded,
                })
                .publish(&self.event_publisher);
            }

            if let Some(next_hop) = desired.get(position + 1).copied() {
                let delivered = already_delivered || delivered_by.is_some();
                let actual = if delivered && self.delivered_shortcut {
                    vec![self.me]
                } else {
                    actual
                };
                self.outbox.push_relay(
                    next_hop,
                    id,
                    &content,
                    DolevPath {
                        desired,
                        actual,
                        priority,
                    },
                );
            }
        }

        match delivered_by {
            Some(cause) => {
                self.delivered.insert(id);
                self.collectors.remove(&id);
                Event::Deliver(DeliverEvent {
                    timestamp: SystemTime::now(),
                    node: self.me,
                    id,
                    cause,
                })
                .publish(&self.event_publisher);
                Ok(Some(Delivery { id, content }))
            }
            None => Ok(None),
        }
    }

    /// Send everything queued since the last flush.
    pub(crate) fn flush<N: Network>(
        &mut self,
        sender: &mut SenderHandle<N>,
    ) -> Result<(), ProtocolError> {
        for (next_hop, envelope) in self.outbox.drain() {
            for part in &envelope.parts {
                Event::Relay(RelayEvent {
                    timestamp: SystemTime::now(),
                    node: self.me,
                    id: part.id,
                    next_hop,
                    paths: part.paths.len(),
                })
                .publish(&self.event_publisher);
            }
            let tracking_id = envelope
                .parts
                .first()
                .map(|part| part.id.tracking_id)
                .unwrap_or_default();
            sender.send(self.message_type, next_hop, tracking_id, &envelope)?;
        }
        Ok(())
    }

    /// Where this node sits on `path`, if `path` is a route from `origin` that `src` forwarded to this
    /// node as its next hop.
    ///
    /// An actual path longer than the desired route up to this node means a relay appended itself
    /// more than once, which is an invariant violation.
    fn check_path(
        &self,
        src: NodeId,
        origin: NodeId,
        path: &DolevPath,
    ) -> Result<Option<usize>, ProtocolError> {
        let Some(position) = path.desired.iter().position(|node| *node == self.me) else {
            return Ok(None);
        };
        if position == 0
            || path.desired.first() != Some(&origin)
            || path.desired[position - 1] != src
            || path.actual.last() != Some(&src)
        {
            return Ok(None);
        }
        if path.actual.len() > position {
            return Err(ProtocolError::InvariantViolation(format!(
                "actual path {:?} is longer than the desired route {:?} up to node {}",
                path.actual, path.desired, self.me
            )));
        }
        Ok(Some(position))
    }

    fn ignore(&self, src: NodeId, reason: IgnoreReason) {
        Event::IgnoreMessage(IgnoreMessageEvent {
            timestamp: SystemTime::now(),
            node: self.me,
            src,
            message_type: self.message_type,
            reason,
        })
        .publish(&self.event_publisher);
    }
}

/// This node's routing table. With priority resolution enabled, every node's table is computed, since
/// conflicts are between routes of different origins.
fn compute_routing_table(config: &Config) -> Result<RoutingTable, ProtocolError> {
    let graph = config
        .topology
        .as_ref()
        .ok_or(ProtocolError::Config(ConfigError::MissingTopology))?;
    let resilience = config.resilience();
    let bias_weight = config.routing.bias_weight;

    if !config.routing.resolve_priorities {
        return Ok(build_lookup_table(graph, config.id, resilience, bias_weight)?);
    }
    let mut tables = build_all_lookup_tables(graph, resilience, bias_weight)?;
    resolve_forwarding_priority(&mut tables)?;
    tables
        .remove(&config.id)
        .ok_or(ProtocolError::Routing(RoutingError::NodeNotFound(config.id)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::RoutingConfig;
    use crate::event_bus::EventHandlers;
    use crate::graph::{Graph, Topology};
    use crate::types::{SequenceNumber, TrackingId};

    fn n(int: u64) -> NodeId {
        NodeId::new(int)
    }

    fn nodes(ints: &[u64]) -> Vec<NodeId> {
        ints.iter().copied().map(n).collect()
    }

    /// Two disjoint routes from 0 to 3: through 1 and through 2.
    fn square() -> Topology {
        let mut graph = Graph::new();
        graph.add_undirected_edge(n(0), n(1), 1.0);
        graph.add_undirected_edge(n(0), n(2), 1.0);
        graph.add_undirected_edge(n(1), n(3), 1.0);
        graph.add_undirected_edge(n(2), n(3), 1.0);
        Topology::new(graph, 1)
    }

    fn new_core(me: u64, routing: RoutingConfig) -> RoutedDolevCore {
        let config = Config {
            routing,
            ..Config::for_node(&square(), n(me))
        };
        RoutedDolevCore::new(
            &config,
            MessageType::DolevRouted,
            None,
            EventPublisher::new(false, Arc::new(EventHandlers::new())),
        )
        .unwrap()
    }

    fn two_routes() -> RoutingConfig {
        RoutingConfig::builder().resilience(2).build()
    }

    fn message(id: MessageId, desired: &[u64], actual: &[u64]) -> RoutedDolevMessage {
        RoutedDolevMessage {
            id,
            content: b"m".to_vec(),
            paths: vec![DolevPath {
                desired: nodes(desired),
                actual: nodes(actual),
                priority: false,
            }],
        }
    }

    fn broadcast_id() -> MessageId {
        MessageId::new(n(0), SequenceNumber::new(0), TrackingId::new(1), b"m")
    }

    #[test]
    fn origin_queues_every_route() {
        let mut core = new_core(0, two_routes());
        let mut next_hops = core.plan().next_hops();
        next_hops.sort();
        assert_eq!(next_hops, nodes(&[1, 2]));
        core.broadcast(broadcast_id(), b"m", false);
        assert!(core.has_delivered(&broadcast_id()));
        let envelopes = core.outbox.drain();
        assert_eq!(envelopes.len(), 2);
        for (next_hop, envelope) in envelopes {
            let part = &envelope.parts[0];
            assert!(part.paths.iter().all(|path| path.desired[1] == next_hop));
            assert!(part.paths.iter().all(|path| path.actual == nodes(&[0])));
        }
    }

    #[test]
    fn direct_message_delivers_and_forwards() {
        let mut core = new_core(1, two_routes());
        let delivery = core
            .on_receive(n(0), message(broadcast_id(), &[0, 1, 3], &[0]))
            .unwrap();
        assert_eq!(
            delivery,
            Some(Delivery {
                id: broadcast_id(),
                content: b"m".to_vec()
            })
        );

        let envelopes = core.outbox.drain();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].0, n(3));
        // Delivered, so the trace restarts here.
        assert_eq!(envelopes[0].1.parts[0].paths[0].actual, nodes(&[1]));
    }

    #[test]
    fn target_needs_both_disjoint_routes() {
        let mut core = new_core(3, two_routes());
        let first = core
            .on_receive(n(1), message(broadcast_id(), &[0, 1, 3], &[0, 1]))
            .unwrap();
        assert_eq!(first, None);
        assert!(!core.has_delivered(&broadcast_id()));

        let second = core
            .on_receive(n(2), message(broadcast_id(), &[0, 2, 3], &[2]))
            .unwrap();
        assert!(second.is_some());
        assert!(core.has_delivered(&broadcast_id()));
        // Final hop of both routes, nothing to forward.
        assert!(core.outbox.is_empty());

        let late = core
            .on_receive(n(1), message(broadcast_id(), &[0, 1, 3], &[0, 1]))
            .unwrap();
        assert_eq!(late, None);
    }

    #[test]
    fn without_shortcut_the_trace_keeps_growing() {
        let routing = RoutingConfig::builder()
            .resilience(2)
            .delivered_shortcut(false)
            .build();
        let mut core = new_core(1, routing);
        core.on_receive(n(0), message(broadcast_id(), &[0, 1, 3], &[0]))
            .unwrap();
        let envelopes = core.outbox.drain();
        assert_eq!(envelopes[0].1.parts[0].paths[0].actual, nodes(&[0, 1]));
    }

    #[test]
    fn foreign_routes_are_ignored() {
        let mut core = new_core(3, two_routes());
        // Claims to come from 2 on a route whose previous hop is 1.
        let delivery = core
            .on_receive(n(2), message(broadcast_id(), &[0, 1, 3], &[0, 1]))
            .unwrap();
        assert_eq!(delivery, None);
        assert!(core.outbox.is_empty());
    }

    #[test]
    fn overlong_actual_path_is_an_invariant_violation() {
        let mut core = new_core(3, two_routes());
        let result = core.on_receive(n(1), message(broadcast_id(), &[0, 1, 3], &[0, 2, 1]));
        assert!(matches!(result, Err(ProtocolError::InvariantViolation(_))));
    }

    #[test]
    fn own_broadcast_coming_back_is_an_invariant_violation() {
        let mut core = new_core(0, two_routes());
        let result = core.on_receive(n(1), message(broadcast_id(), &[0, 1, 3], &[1]));
        assert!(matches!(result, Err(ProtocolError::InvariantViolation(_))));
    }

    #[test]
    fn insufficient_connectivity_fails_initialization() {
        let config = Config::for_node(&square(), n(0));
        // The default resilience 2F+1 = 3 exceeds the square's connectivity.
        let result = RoutedDolevCore::new(
            &config,
            MessageType::DolevRouted,
            None,
            EventPublisher::new(false, Arc::new(EventHandlers::new())),
        );
        assert!(matches!(
            result,
            Err(ProtocolError::Routing(RoutingError::NoPath { .. }))
        ));
    }
}
