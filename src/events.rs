/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events protocols emit, for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Events are dispatched
//! synchronously, on the thread of the node that emitted them, to the
//! [handlers](crate::event_bus::EventHandlers) registered in the node's [`Config`](crate::config::Config).

use std::time::SystemTime;

use crate::event_bus::EventPublisher;
use crate::networking::MessageType;
use crate::types::{MessageId, NodeId};

pub enum Event {
    // Events that start or end a broadcast instance.
    Broadcast(BroadcastEvent),
    Deliver(DeliverEvent),
    // Quorum voting.
    Echo(EchoEvent),
    Ready(ReadyEvent),
    // Path-based dissemination.
    Relay(RelayEvent),
    RecordPath(RecordPathEvent),
    ComputeRoutes(ComputeRoutesEvent),
    // Messages that had no effect.
    IgnoreMessage(IgnoreMessageEvent),
}

impl Event {
    pub(crate) fn publish(self, event_publisher: &EventPublisher) {
        event_publisher.publish(self)
    }
}

/// Why a node delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryCause {
    /// The node started the broadcast itself.
    Origin,
    /// The node received the message straight from its origin.
    Direct,
    /// The node recorded this many vertex-disjoint paths from the origin.
    DisjointPaths(usize),
    /// The node collected this many READY votes.
    ReadyQuorum(usize),
}

/// Why a node sent its READY vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyTrigger {
    /// This many ECHO votes reached the echo quorum.
    EchoQuorum(usize),
    /// This many READY votes from other nodes exceeded the fault bound.
    ReadyAmplification(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The receiving node is Byzantine and runs no protocol logic.
    Byzantine,
    /// The receiving node already delivered this broadcast.
    AlreadyDelivered,
    /// The message is inconsistent with its own id or path, or comes from the wrong sender.
    Malformed,
}

pub struct BroadcastEvent {
    pub timestamp: SystemTime,
    pub node: NodeId,
    pub id: MessageId,
}

pub struct DeliverEvent {
    pub timestamp: SystemTime,
    pub node: NodeId,
    pub id: MessageId,
    pub cause: DeliveryCause,
}

pub struct EchoEvent {
    pub timestamp: SystemTime,
    pub node: NodeId,
    pub id: MessageId,
}

pub struct ReadyEvent {
    pub timestamp: SystemTime,
    pub node: NodeId,
    pub id: MessageId,
    pub trigger: ReadyTrigger,
}

pub struct RelayEvent {
    pub timestamp: SystemTime,
    pub node: NodeId,
    pub id: MessageId,
    pub next_hop: NodeId,
    /// Number of paths (or traces) forwarded in the same message.
    pub paths: usize,
}

pub struct RecordPathEvent {
    pub timestamp: SystemTime,
    pub node: NodeId,
    pub id: MessageId,
    /// Intermediate nodes of the recorded path, excluding the origin and the recording node.
    pub intermediates: Vec<NodeId>,
    /// Number of paths kept for this broadcast after recording.
    pub recorded: usize,
}

pub struct ComputeRoutesEvent {
    pub timestamp: SystemTime,
    pub node: NodeId,
    pub routes: usize,
    pub priority_routes: usize,
    /// Number of messages the node sends to start a broadcast.
    pub messages: usize,
}

pub struct IgnoreMessageEvent {
    pub timestamp: SystemTime,
    pub node: NodeId,
    pub src: NodeId,
    pub message_type: MessageType,
    pub reason: IgnoreReason,
}
