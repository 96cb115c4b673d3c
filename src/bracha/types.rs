/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Quorum arithmetic and per-instance vote state.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::types::{MessageId, NodeId};

/// The vote counts that move a Bracha instance forward, for `N` nodes of which at most `F` are
/// Byzantine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Thresholds {
    /// ECHOs needed to send READY: `⌈(N+F+1)/2⌉`.
    pub echo: usize,
    /// READYs needed to send READY without an echo quorum: `F+1`.
    pub ready: usize,
    /// READYs needed to deliver: `2F+1`.
    pub deliver: usize,
}

impl Thresholds {
    pub fn new(node_count: usize, fault_bound: usize) -> Self {
        Self {
            echo: (node_count + fault_bound + 2) / 2,
            ready: fault_bound + 1,
            deliver: 2 * fault_bound + 1,
        }
    }
}

/// Progress of one broadcast instance at one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Init,
    EchoSent,
    ReadySent,
    Delivered,
}

#[derive(Debug, Default)]
pub(crate) struct VoteState {
    pub(crate) echo: BTreeSet<NodeId>,
    pub(crate) ready: BTreeSet<NodeId>,
    pub(crate) echo_sent: bool,
    pub(crate) ready_sent: bool,
    pub(crate) content: Option<Vec<u8>>,
}

impl VoteState {
    fn phase(&self) -> Phase {
        if self.ready_sent {
            Phase::ReadySent
        } else if self.echo_sent {
            Phase::EchoSent
        } else {
            Phase::Init
        }
    }
}

/// Vote state of every instance a node has seen but not delivered, and the ids of the delivered ones.
///
/// Vote state is removed when its instance is delivered, so the store only grows with the number of
/// delivered ids.
#[derive(Debug, Default)]
pub(crate) struct BrachaStore {
    states: HashMap<MessageId, VoteState>,
    delivered: HashSet<MessageId>,
}

impl BrachaStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_delivered(&self, id: &MessageId) -> bool {
        self.delivered.contains(id)
    }

    pub(crate) fn get_mut(&mut self, id: &MessageId) -> Option<&mut VoteState> {
        self.states.get_mut(id)
    }

    /// Vote state of `id`, created empty on first use.
    ///
    /// # Precondition
    ///
    /// `id` has not been delivered.
    pub(crate) fn get_or_insert(&mut self, id: MessageId) -> &mut VoteState {
        self.states.entry(id).or_default()
    }

    /// Record `id` as delivered and return its vote state, which the store forgets.
    pub(crate) fn mark_delivered(&mut self, id: MessageId) -> Option<VoteState> {
        self.delivered.insert(id);
        self.states.remove(&id)
    }

    pub(crate) fn phase(&self, id: &MessageId) -> Phase {
        if self.delivered.contains(id) {
            return Phase::Delivered;
        }
        self.states
            .get(id)
            .map(VoteState::phase)
            .unwrap_or(Phase::Init)
    }

    /// Number of instances with live vote state.
    pub(crate) fn pending(&self) -> usize {
        self.states.len()
    }
}
