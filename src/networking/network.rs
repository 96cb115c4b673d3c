/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::fmt::{self, Display, Formatter};

use crate::types::{NodeId, TrackingId};

use super::messages::MessageType;

/// Outbound half of the simulated network, implemented by the harness.
pub trait Network: Send {
    /// Enqueue `payload` for asynchronous delivery to `destination` without blocking.
    ///
    /// `tracking_id` is passed through for the harness's statistics. Failing to send is a local
    /// configuration error, and protocols treat it as fatal.
    fn send(
        &mut self,
        message_type: MessageType,
        destination: NodeId,
        tracking_id: TrackingId,
        payload: Vec<u8>,
    ) -> Result<(), SendError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendError {
    /// The network has no actor with this id.
    UnknownDestination(NodeId),

    /// The destination's inbound queue is gone, e.g. because the run was stopped.
    Disconnected(NodeId),
}

impl Display for SendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SendError::UnknownDestination(id) => write!(f, "unknown destination {}", id),
            SendError::Disconnected(id) => write!(f, "destination {} disconnected", id),
        }
    }
}

impl std::error::Error for SendError {}
