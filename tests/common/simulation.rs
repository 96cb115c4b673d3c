//! [`Simulation`], a deterministic single-threaded harness that runs one protocol instance per node.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

use brb_rs::{
    config::Config,
    graph::Topology,
    protocol::{init_protocol, Protocol, ProtocolError, ProtocolKind},
    types::{NodeId, TrackingId},
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{
    app::{Deliveries, Delivery, RecordingApp},
    network::{Envelope, NetworkStub, SharedQueue},
};

/// Upper bound on the number of messages a run may process before it is considered stuck.
const MAX_STEPS: usize = 1_000_000;

pub(crate) struct Simulation {
    queue: SharedQueue,
    nodes: BTreeMap<NodeId, Box<dyn Protocol<NetworkStub, RecordingApp>>>,
    deliveries: BTreeMap<NodeId, Deliveries>,
    rng: Option<StdRng>,
    processed: usize,
}

impl Simulation {
    /// Initialize a node of `kind` for every config.
    pub(crate) fn new(
        kind: ProtocolKind,
        configs: impl IntoIterator<Item = Config>,
    ) -> Result<Simulation, ProtocolError> {
        let queue: SharedQueue = Arc::new(Mutex::new(VecDeque::new()));
        let mut nodes = BTreeMap::new();
        let mut deliveries = BTreeMap::new();

        for config in configs {
            let id = config.id;
            let network = NetworkStub::new(id, config.neighbors.clone(), queue.clone());
            let app = RecordingApp::new();
            deliveries.insert(id, app.deliveries());
            nodes.insert(id, init_protocol(kind, network, app, config)?);
        }

        Ok(Simulation {
            queue,
            nodes,
            deliveries,
            rng: None,
            processed: 0,
        })
    }

    /// Initialize every node of `topology` with the config that `configure` derives from its default
    /// one.
    pub(crate) fn on_topology(
        kind: ProtocolKind,
        topology: &Topology,
        configure: impl Fn(Config) -> Config,
    ) -> Result<Simulation, ProtocolError> {
        let configs: Vec<Config> = topology
            .graph
            .node_ids()
            .map(|id| configure(Config::for_node(topology, id)))
            .collect();
        Simulation::new(kind, configs)
    }

    /// Deliver queued messages in a random order drawn from `seed` instead of first-in first-out.
    pub(crate) fn shuffled(mut self, seed: u64) -> Simulation {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    pub(crate) fn broadcast(
        &mut self,
        origin: NodeId,
        tracking_id: TrackingId,
        payload: &[u8],
    ) -> Result<(), ProtocolError> {
        self.nodes
            .get_mut(&origin)
            .unwrap()
            .broadcast(tracking_id, payload.to_vec())
    }

    /// Process queued messages until none are left. Returns the number of messages processed.
    pub(crate) fn run(&mut self) -> Result<usize, ProtocolError> {
        let start = self.processed;
        while self.step()?.is_some() {
            assert!(self.processed < MAX_STEPS, "run did not quiesce");
        }
        Ok(self.processed - start)
    }

    /// Process the next queued message, if any, and return it.
    pub(crate) fn step(&mut self) -> Result<Option<Envelope>, ProtocolError> {
        let Some(envelope) = self.next_envelope() else {
            return Ok(None);
        };
        self.processed += 1;
        self.inject(envelope.clone())?;
        Ok(Some(envelope))
    }

    /// Hand a message to its destination directly, bypassing the queue.
    pub(crate) fn inject(&mut self, envelope: Envelope) -> Result<(), ProtocolError> {
        self.nodes.get_mut(&envelope.destination).unwrap().receive(
            envelope.message_type,
            envelope.src,
            envelope.tracking_id,
            &envelope.payload,
        )
    }

    /// Remove and return every queued message.
    pub(crate) fn take_queue(&mut self) -> Vec<Envelope> {
        self.queue.lock().unwrap().drain(..).collect()
    }

    pub(crate) fn deliveries(&self, node: NodeId) -> Vec<Delivery> {
        self.deliveries[&node].lock().unwrap().clone()
    }

    /// The nodes that delivered `payload` exactly once.
    pub(crate) fn delivered_once(&self, payload: &[u8]) -> BTreeSet<NodeId> {
        self.deliveries
            .iter()
            .filter(|(_, deliveries)| {
                deliveries
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|delivery| delivery.payload == payload)
                    .count()
                    == 1
            })
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn messages_sent(&self) -> u64 {
        self.nodes.values().map(|node| node.messages_sent()).sum()
    }

    pub(crate) fn node_ids(&self) -> BTreeSet<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn next_envelope(&mut self) -> Option<Envelope> {
        let mut queue = self.queue.lock().unwrap();
        match &mut self.rng {
            Some(rng) if !queue.is_empty() => {
                let index = rng.gen_range(0, queue.len());
                queue.remove(index)
            }
            _ => queue.pop_front(),
        }
    }
}
