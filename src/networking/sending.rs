/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and types for sending messages to the simulated network.

use borsh::BorshSerialize;

use crate::protocol::ProtocolError;
use crate::types::{NodeId, TrackingId};

use super::messages::{encode, MessageType};
use super::network::Network;

/// Handle for sending messages to the [`Network`].
///
/// It can send instances of any type that implements [`BorshSerialize`]. Send failures are converted
/// into [`ProtocolError::Send`], which callers propagate.
pub(crate) struct SenderHandle<N: Network> {
    network: N,
    sent: u64,
}

impl<N: Network> SenderHandle<N> {
    pub(crate) fn new(network: N) -> Self {
        Self { network, sent: 0 }
    }

    pub(crate) fn send<M: BorshSerialize>(
        &mut self,
        message_type: MessageType,
        destination: NodeId,
        tracking_id: TrackingId,
        message: &M,
    ) -> Result<(), ProtocolError> {
        let payload = encode(message)?;
        self.send_bytes(message_type, destination, tracking_id, payload)
    }

    /// Send the same message to every node in `destinations`, encoding it once.
    pub(crate) fn multicast<M: BorshSerialize>(
        &mut self,
        message_type: MessageType,
        destinations: impl IntoIterator<Item = NodeId>,
        tracking_id: TrackingId,
        message: &M,
    ) -> Result<(), ProtocolError> {
        let payload = encode(message)?;
        for destination in destinations {
            self.send_bytes(message_type, destination, tracking_id, payload.clone())?;
        }
        Ok(())
    }

    pub(crate) fn send_bytes(
        &mut self,
        message_type: MessageType,
        destination: NodeId,
        tracking_id: TrackingId,
        payload: Vec<u8>,
    ) -> Result<(), ProtocolError> {
        self.network
            .send(message_type, destination, tracking_id, payload)?;
        self.sent += 1;
        Ok(())
    }

    /// Number of messages handed to the network so far.
    pub(crate) fn sent(&self) -> u64 {
        self.sent
    }
}
