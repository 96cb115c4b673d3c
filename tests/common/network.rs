use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc, Mutex,
    },
    time::Duration,
};

use brb_rs::{
    networking::{MessageType, Network, SendError},
    types::{NodeId, TrackingId},
};

/// A message in flight.
#[derive(Clone, Debug)]
pub(crate) struct Envelope {
    pub(crate) src: NodeId,
    pub(crate) destination: NodeId,
    pub(crate) message_type: MessageType,
    pub(crate) tracking_id: TrackingId,
    pub(crate) payload: Vec<u8>,
}

pub(crate) type SharedQueue = Arc<Mutex<VecDeque<Envelope>>>;

/// A network stub that appends every message to a queue shared by all nodes of a
/// [`Simulation`](super::simulation::Simulation). Sending to a node that is not a neighbor fails.
#[derive(Clone)]
pub(crate) struct NetworkStub {
    me: NodeId,
    links: BTreeSet<NodeId>,
    queue: SharedQueue,
}

impl NetworkStub {
    pub(crate) fn new(me: NodeId, links: BTreeSet<NodeId>, queue: SharedQueue) -> Self {
        Self { me, links, queue }
    }
}

impl Network for NetworkStub {
    fn send(
        &mut self,
        message_type: MessageType,
        destination: NodeId,
        tracking_id: TrackingId,
        payload: Vec<u8>,
    ) -> Result<(), SendError> {
        if !self.links.contains(&destination) {
            return Err(SendError::UnknownDestination(destination));
        }
        self.queue.lock().unwrap().push_back(Envelope {
            src: self.me,
            destination,
            message_type,
            tracking_id,
            payload,
        });
        Ok(())
    }
}

/// A mock network stub which passes messages from and to threads using channels.
pub(crate) struct ChannelNetwork {
    me: NodeId,
    peers: BTreeMap<NodeId, Sender<Envelope>>,
}

impl Network for ChannelNetwork {
    fn send(
        &mut self,
        message_type: MessageType,
        destination: NodeId,
        tracking_id: TrackingId,
        payload: Vec<u8>,
    ) -> Result<(), SendError> {
        let peer = self
            .peers
            .get(&destination)
            .ok_or(SendError::UnknownDestination(destination))?;
        // A peer that already stopped no longer needs messages.
        let _ = peer.send(Envelope {
            src: self.me,
            destination,
            message_type,
            tracking_id,
            payload,
        });
        Ok(())
    }
}

/// The receiving end of a node's channel.
pub(crate) struct Inbox(Receiver<Envelope>);

impl Inbox {
    pub(crate) fn recv(&self, timeout: Duration) -> Option<Envelope> {
        match self.0.recv_timeout(timeout) {
            Ok(envelope) => Some(envelope),
            // Every peer has stopped.
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// One channel network per node in `links`, each able to send to the node's linked peers.
pub(crate) fn mock_network(
    links: &BTreeMap<NodeId, BTreeSet<NodeId>>,
) -> Vec<(NodeId, ChannelNetwork, Inbox)> {
    let (senders, receivers): (BTreeMap<_, _>, Vec<_>) = links
        .keys()
        .map(|id| {
            let (sender, receiver) = mpsc::channel();
            ((*id, sender), (*id, receiver))
        })
        .unzip();

    receivers
        .into_iter()
        .map(|(me, receiver)| {
            let peers = links[&me]
                .iter()
                .map(|peer| (*peer, senders[peer].clone()))
                .collect();
            (me, ChannelNetwork { me, peers }, Inbox(receiver))
        })
        .collect()
}
