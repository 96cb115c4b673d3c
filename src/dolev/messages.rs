/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for structured messages that are sent between nodes as part of the Dolev protocols.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{MessageId, NodeId};

/// A flooded [`Dolev`](super::Dolev) message.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DolevMessage {
    pub id: MessageId,
    pub content: Vec<u8>,
    /// Relays the message went through, oldest first, excluding the origin. The last entry is the
    /// sender. An empty trace from a node other than the origin means the sender has delivered.
    pub path: Vec<NodeId>,
}

/// One route a routed message is travelling along.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DolevPath {
    /// The route computed by the origin, from the origin to the route's destination.
    pub desired: Vec<NodeId>,
    /// The nodes the message went through so far. Starts at the origin, or at the last relay that had
    /// already delivered when it forwarded the message.
    pub actual: Vec<NodeId>,
    /// Whether relays forward this route ahead of other traffic.
    pub priority: bool,
}

/// A routed message for one broadcast instance, carrying every route it travels along to one next hop.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RoutedDolevMessage {
    pub id: MessageId,
    pub content: Vec<u8>,
    pub paths: Vec<DolevPath>,
}

/// What a routed protocol sends over one link: the messages of one or more broadcast instances that
/// were bound for the same next hop at the same time.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RoutedDolevEnvelope {
    pub parts: Vec<RoutedDolevMessage>,
}
