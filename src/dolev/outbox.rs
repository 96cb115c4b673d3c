/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-next-hop buffer of routed messages waiting to be sent.
//!
//! A routed node queues everything it wants to send while it handles one event, then drains the outbox
//! once at the end. Draining puts priority routes first, so that routes that could otherwise wait on
//! each other in a cycle keep moving. With merging enabled, everything bound for the same next hop
//! leaves in a single envelope, and relays of the same broadcast share a single part.

use crate::types::{MessageId, NodeId};

use super::messages::{DolevPath, RoutedDolevEnvelope, RoutedDolevMessage};

struct Pending {
    next_hop: NodeId,
    priority: bool,
    part: RoutedDolevMessage,
}

pub(crate) struct Outbox {
    merge: bool,
    pending: Vec<Pending>,
}

impl Outbox {
    pub(crate) fn new(merge: bool) -> Self {
        Self {
            merge,
            pending: Vec::new(),
        }
    }

    /// Queue the routes of one broadcast plan entry as a part of their own.
    pub(crate) fn push_entry(
        &mut self,
        next_hop: NodeId,
        id: MessageId,
        content: &[u8],
        paths: Vec<DolevPath>,
    ) {
        if paths.is_empty() {
            return;
        }
        self.pending.push(Pending {
            next_hop,
            priority: paths.iter().any(|path| path.priority),
            part: RoutedDolevMessage {
                id,
                content: content.to_vec(),
                paths,
            },
        });
    }

    /// Queue one relayed route. With merging enabled, the route joins a pending part of the same
    /// broadcast to the same next hop, if there is one.
    pub(crate) fn push_relay(
        &mut self,
        next_hop: NodeId,
        id: MessageId,
        content: &[u8],
        path: DolevPath,
    ) {
        if self.merge {
            if let Some(pending) = self
                .pending
                .iter_mut()
                .find(|pending| pending.next_hop == next_hop && pending.part.id == id)
            {
                pending.priority |= path.priority;
                pending.part.paths.push(path);
                return;
            }
        }
        self.pending.push(Pending {
            next_hop,
            priority: path.priority,
            part: RoutedDolevMessage {
                id,
                content: content.to_vec(),
                paths: vec![path],
            },
        });
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every queued part, packed into envelopes in sending order.
    pub(crate) fn drain(&mut self) -> Vec<(NodeId, RoutedDolevEnvelope)> {
        let mut pending = std::mem::take(&mut self.pending);
        // Both sorts are stable, so queueing order survives among equals.
        for entry in &mut pending {
            entry.part.paths.sort_by_key(|path| !path.priority);
        }
        pending.sort_by_key(|entry| !entry.priority);

        if !self.merge {
            return pending
                .into_iter()
                .map(|entry| {
                    (
                        entry.next_hop,
                        RoutedDolevEnvelope {
                            parts: vec![entry.part],
                        },
                    )
                })
                .collect();
        }

        let mut envelopes: Vec<(NodeId, RoutedDolevEnvelope)> = Vec::new();
        for entry in pending {
            match envelopes
                .iter_mut()
                .find(|(next_hop, _)| *next_hop == entry.next_hop)
            {
                Some((_, envelope)) => envelope.parts.push(entry.part),
                None => envelopes.push((
                    entry.next_hop,
                    RoutedDolevEnvelope {
                        parts: vec![entry.part],
                    },
                )),
            }
        }
        envelopes
    }
}
