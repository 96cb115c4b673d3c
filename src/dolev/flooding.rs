/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [`Dolev`], the flooding variant.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::SystemTime;

use crate::app::Application;
use crate::config::Config;
use crate::event_bus::EventPublisher;
use crate::events::*;
use crate::networking::messages::decode;
use crate::networking::sending::SenderHandle;
use crate::networking::{MessageType, Network};
use crate::protocol::{Protocol, ProtocolError, ProtocolKind};
use crate::types::{MessageId, NodeId, SequenceNumber, TrackingId};

use super::collector::PathCollector;
use super::messages::DolevMessage;

#[derive(Default)]
struct FloodState {
    collector: PathCollector,
    /// Neighbors that told this node they have delivered.
    delivered_neighbors: BTreeSet<NodeId>,
}

/// Dolev's protocol over flooding. Works on any topology whose connectivity is at least `2F+1`.
pub struct Dolev<N: Network, A: Application> {
    me: NodeId,
    fault_bound: usize,
    byzantine: bool,
    delivered_shortcut: bool,
    neighbors: BTreeSet<NodeId>,
    states: HashMap<MessageId, FloodState>,
    delivered: HashSet<MessageId>,
    sequence: SequenceNumber,
    sender: SenderHandle<N>,
    application: A,
    event_publisher: EventPublisher,
}

impl<N: Network, A: Application> Dolev<N, A> {
    pub fn has_delivered(&self, id: &MessageId) -> bool {
        self.delivered.contains(id)
    }

    fn on_receive_message(&mut self, src: NodeId, message: DolevMessage) -> Result<(), ProtocolError> {
        let DolevMessage { id, content, path } = message;

        if !id.matches(&content) {
            log::warn!("Dolev message from {} does not match its id {}", src, id);
            self.ignore(src, IgnoreReason::Malformed);
            return Ok(());
        }
        if id.origin == self.me {
            return Err(ProtocolError::InvariantViolation(format!(
                "node {} received its own broadcast {} back from {}",
                self.me, id, src
            )));
        }
        if !self.is_well_formed(src, id.origin, &path) {
            log::warn!("Dolev message {} from {} has an invalid trace {:?}", id, src, path);
            self.ignore(src, IgnoreReason::Malformed);
            return Ok(());
        }

        if self.delivered.contains(&id) {
            if self.delivered_shortcut {
                self.ignore(src, IgnoreReason::AlreadyDelivered);
                return Ok(());
            }
            // Keep flooding, so that nodes behind this one still see every path.
            let recorded = if src == id.origin {
                Vec::new()
            } else if path.is_empty() {
                vec![src]
            } else {
                path
            };
            return self.relay(id, &content, recorded, src);
        }

        if src == id.origin {
            return self.deliver(id, content, DeliveryCause::Direct, Vec::new(), src);
        }

        // An empty trace from a relay means the relay has delivered. The path through it is as good as
        // a direct one from its point of view.
        let recorded = if path.is_empty() {
            self.states
                .entry(id)
                .or_default()
                .delivered_neighbors
                .insert(src);
            vec![src]
        } else {
            path
        };

        let state = self.states.entry(id).or_default();
        let kept = state.collector.record(recorded.iter().copied());
        let sufficient = state.collector.has_disjoint(self.fault_bound + 1);
        Event::RecordPath(RecordPathEvent {
            timestamp: SystemTime::now(),
            node: self.me,
            id,
            intermediates: recorded.clone(),
            recorded: state.collector.len(),
        })
        .publish(&self.event_publisher);

        if sufficient {
            self.deliver(
                id,
                content,
                DeliveryCause::DisjointPaths(self.fault_bound + 1),
                recorded,
                src,
            )
        } else if kept {
            self.relay(id, &content, recorded, src)
        } else {
            Ok(())
        }
    }

    // The trace must be a simple path of relays ending at the sender, and must not contain the origin or
    // this node. The origin itself always sends an empty trace.
    fn is_well_formed(&self, src: NodeId, origin: NodeId, path: &[NodeId]) -> bool {
        if src == origin {
            return path.is_empty();
        }
        let distinct: BTreeSet<&NodeId> = path.iter().collect();
        distinct.len() == path.len()
            && !path.contains(&self.me)
            && !path.contains(&origin)
            && path.last().map_or(true, |last| *last == src)
    }

    fn deliver(
        &mut self,
        id: MessageId,
        content: Vec<u8>,
        cause: DeliveryCause,
        recorded: Vec<NodeId>,
        src: NodeId,
    ) -> Result<(), ProtocolError> {
        self.delivered.insert(id);
        let state = self.states.remove(&id).unwrap_or_default();
        self.application.deliver(id.tracking_id, &content, id.origin);
        Event::Deliver(DeliverEvent {
            timestamp: SystemTime::now(),
            node: self.me,
            id,
            cause,
        })
        .publish(&self.event_publisher);

        if self.delivered_shortcut {
            // Tell every neighbor that has not delivered yet, with an empty trace.
            let destinations: Vec<NodeId> = self
                .neighbors
                .iter()
                .filter(|neighbor| {
                    **neighbor != id.origin && !state.delivered_neighbors.contains(*neighbor)
                })
                .copied()
                .collect();
            self.send_to(id, content, Vec::new(), destinations)
        } else {
            self.relay(id, &content, recorded, src)
        }
    }

    /// Forward a message that reached this node through `recorded`, to every neighbor that is not on the
    /// path and has not delivered.
    fn relay(
        &mut self,
        id: MessageId,
        content: &[u8],
        recorded: Vec<NodeId>,
        src: NodeId,
    ) -> Result<(), ProtocolError> {
        let delivered_neighbors = self
            .states
            .get(&id)
            .map(|state| state.delivered_neighbors.clone())
            .unwrap_or_default();
        let destinations: Vec<NodeId> = self
            .neighbors
            .iter()
            .filter(|neighbor| {
                **neighbor != src
                    && **neighbor != id.origin
                    && !recorded.contains(*neighbor)
                    && !delivered_neighbors.contains(*neighbor)
            })
            .copied()
            .collect();

        let mut path = recorded;
        path.push(self.me);
        self.send_to(id, content.to_vec(), path, destinations)
    }

    fn send_to(
        &mut self,
        id: MessageId,
        content: Vec<u8>,
        path: Vec<NodeId>,
        destinations: Vec<NodeId>,
    ) -> Result<(), ProtocolError> {
        if destinations.is_empty() {
            return Ok(());
        }
        for next_hop in &destinations {
            Event::Relay(RelayEvent {
                timestamp: SystemTime::now(),
                node: self.me,
                id,
                next_hop: *next_hop,
                paths: 1,
            })
            .publish(&self.event_publisher);
        }
        let message = DolevMessage { id, content, path };
        self.sender
            .multicast(MessageType::Dolev, destinations, id.tracking_id, &message)
    }

    fn ignore(&self, src: NodeId, reason: IgnoreReason) {
        Event::IgnoreMessage(IgnoreMessageEvent {
            timestamp: SystemTime::now(),
            node: self.me,
            src,
            message_type: MessageType::Dolev,
            reason,
        })
        .publish(&self.event_publisher);
    }
}

impl<N: Network, A: Application> Protocol<N, A> for Dolev<N, A> {
    fn init(network: N, application: A, config: Config) -> Result<Self, ProtocolError> {
        config.validate(ProtocolKind::Dolev)?;
        Ok(Self {
            me: config.id,
            fault_bound: config.fault_bound,
            byzantine: config.byzantine,
            delivered_shortcut: config.routing.delivered_shortcut,
            neighbors: config.neighbors,
            states: HashMap::new(),
            delivered: HashSet::new(),
            sequence: SequenceNumber::new(0),
            sender: SenderHandle::new(network),
            application,
            event_publisher: EventPublisher::new(config.log_events, config.event_handlers),
        })
    }

    fn receive(
        &mut self,
        message_type: MessageType,
        src: NodeId,
        _tracking_id: TrackingId,
        payload: &[u8],
    ) -> Result<(), ProtocolError> {
        if self.byzantine {
            log::debug!("Byzantine node {} drops {} from {}", self.me, message_type, src);
            self.ignore(src, IgnoreReason::Byzantine);
            return Ok(());
        }
        if message_type != MessageType::Dolev {
            return Err(ProtocolError::UnexpectedMessageType(message_type));
        }
        let message: DolevMessage = decode(payload)?;
        self.on_receive_message(src, message)
    }

    fn broadcast(&mut self, tracking_id: TrackingId, payload: Vec<u8>) -> Result<(), ProtocolError> {
        if self.byzantine {
            log::debug!("Byzantine node {} does not broadcast", self.me);
            return Ok(());
        }

        let id = MessageId::new(self.me, self.sequence.next(), tracking_id, &payload);
        Event::Broadcast(BroadcastEvent {
            timestamp: SystemTime::now(),
            node: self.me,
            id,
        })
        .publish(&self.event_publisher);

        self.delivered.insert(id);
        self.application.deliver(tracking_id, &payload, self.me);
        Event::Deliver(DeliverEvent {
            timestamp: SystemTime::now(),
            node: self.me,
            id,
            cause: DeliveryCause::Origin,
        })
        .publish(&self.event_publisher);

        let destinations: Vec<NodeId> = self.neighbors.iter().copied().collect();
        self.send_to(id, payload, Vec::new(), destinations)
    }

    fn id(&self) -> NodeId {
        self.me
    }

    fn messages_sent(&self) -> u64 {
        self.sender.sent()
    }
}
